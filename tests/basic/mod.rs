//! Raw SQL and schema output through the command line

use crate::helpers::{arg, create_temp_dir, prepare_test_file, run_test_case, SqlaiTestCase, TestResult};

#[test]
fn test_basic_select() -> TestResult {
    let temp_dir = create_temp_dir()?;
    let test_file = prepare_test_file(temp_dir.path())?;

    run_test_case(
        SqlaiTestCase {
            args: vec![arg(&test_file), "-s".into(), "SELECT * FROM people".into()],
            expected_stdout: vec![
                "id,name,age".into(),
                "1,Alice,30".into(),
                "2,Bob,25".into(),
                "3,Charlie,35".into(),
            ],
            ..Default::default()
        },
        temp_dir.path(),
    )
}

#[test]
fn test_filtered_select() -> TestResult {
    let temp_dir = create_temp_dir()?;
    let test_file = prepare_test_file(temp_dir.path())?;

    run_test_case(
        SqlaiTestCase {
            args: vec![
                arg(&test_file),
                "-s".into(),
                "SELECT name FROM people WHERE age > 28 ORDER BY age".into(),
            ],
            expected_stdout: vec!["name\nAlice\nCharlie\n".into()],
            unexpected_stdout: vec!["Bob".into()],
            ..Default::default()
        },
        temp_dir.path(),
    )
}

#[test]
fn test_select_with_no_rows_prints_header() -> TestResult {
    let temp_dir = create_temp_dir()?;
    let test_file = prepare_test_file(temp_dir.path())?;

    run_test_case(
        SqlaiTestCase {
            args: vec![
                arg(&test_file),
                "-s".into(),
                "SELECT name FROM people WHERE age > 100".into(),
            ],
            expected_stdout: vec!["name\n".into()],
            unexpected_stdout: vec!["Alice".into()],
            ..Default::default()
        },
        temp_dir.path(),
    )
}

#[test]
fn test_delete_persists_in_database() -> TestResult {
    let temp_dir = create_temp_dir()?;
    let test_file = prepare_test_file(temp_dir.path())?;

    run_test_case(
        SqlaiTestCase {
            args: vec![
                arg(&test_file),
                "-s".into(),
                "DELETE FROM people WHERE age < 32".into(),
            ],
            expected_stdout: vec!["Query executed successfully".into()],
            ..Default::default()
        },
        temp_dir.path(),
    )?;

    // Same database, no files: the change was committed
    run_test_case(
        SqlaiTestCase {
            args: vec!["-s".into(), "SELECT COUNT(*) AS n FROM people".into()],
            expected_stdout: vec!["n\n1\n".into()],
            ..Default::default()
        },
        temp_dir.path(),
    )
}

#[test]
fn test_statements_run_in_order() -> TestResult {
    let temp_dir = create_temp_dir()?;
    let test_file = prepare_test_file(temp_dir.path())?;

    run_test_case(
        SqlaiTestCase {
            args: vec![
                arg(&test_file),
                "-s".into(),
                "UPDATE people SET age = 31 WHERE name = 'Alice'".into(),
                "-s".into(),
                "SELECT age FROM people WHERE name = 'Alice'".into(),
                "-v".into(),
            ],
            expected_stdout: vec![
                "Query executed successfully".into(),
                "1 rows affected".into(),
                "age\n31\n".into(),
            ],
            ..Default::default()
        },
        temp_dir.path(),
    )
}

#[test]
fn test_unknown_column_fails_without_change() -> TestResult {
    let temp_dir = create_temp_dir()?;
    let test_file = prepare_test_file(temp_dir.path())?;

    run_test_case(
        SqlaiTestCase {
            args: vec![
                arg(&test_file),
                "-s".into(),
                "UPDATE people SET salary = 1".into(),
            ],
            expected_stderr: vec!["Error:".into(), "no such column: salary".into()],
            should_succeed: false,
            ..Default::default()
        },
        temp_dir.path(),
    )?;

    run_test_case(
        SqlaiTestCase {
            args: vec!["--print-schema".into()],
            expected_stdout: vec!["people(id INTEGER, name TEXT, age INTEGER)".into()],
            unexpected_stdout: vec!["salary".into()],
            ..Default::default()
        },
        temp_dir.path(),
    )
}

#[test]
fn test_print_schema() -> TestResult {
    let temp_dir = create_temp_dir()?;
    let test_file = prepare_test_file(temp_dir.path())?;
    let orders = crate::helpers::create_custom_csv(
        temp_dir.path(),
        "orders.csv",
        "order_id,status,amount\n1,SHIPPED,10.5\n2,PENDING,200\n",
    )?;

    run_test_case(
        SqlaiTestCase {
            args: vec![arg(&test_file), arg(&orders), "--print-schema".into()],
            expected_stdout: vec![
                "people(id INTEGER, name TEXT, age INTEGER)\norders(order_id INTEGER, status TEXT, amount REAL)"
                    .into(),
            ],
            ..Default::default()
        },
        temp_dir.path(),
    )
}

#[test]
fn test_nothing_to_do() -> TestResult {
    let temp_dir = create_temp_dir()?;

    run_test_case(
        SqlaiTestCase {
            expected_stderr: vec!["Nothing to do".into()],
            should_succeed: false,
            ..Default::default()
        },
        temp_dir.path(),
    )
}
