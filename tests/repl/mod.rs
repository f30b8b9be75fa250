//! Interactive shell driven through stdin

use crate::helpers::{
    arg, create_custom_csv, create_temp_dir, prepare_test_file, run_test_case, FakeModelServer,
    Reply, SqlaiTestCase, TestResult,
};

#[test]
fn test_repl_dot_commands() -> TestResult {
    let temp_dir = create_temp_dir()?;
    let test_file = prepare_test_file(temp_dir.path())?;

    run_test_case(
        SqlaiTestCase {
            args: vec![arg(&test_file), "--interactive".into()],
            stdin: Some(".help\n.tables\n.schema people\n.stats on\n.show\n.exit\n".into()),
            expected_stdout: vec![
                "Welcome to sqlai interactive mode!".into(),
                "Available commands:".into(),
                "Tables:\n  people\n".into(),
                "people(id INTEGER, name TEXT, age INTEGER)".into(),
                "Statistics display enabled".into(),
                "Mutations:    confirm".into(),
            ],
            ..Default::default()
        },
        temp_dir.path(),
    )?;
    assert!(temp_dir.path().join(".sqlai_history").exists());
    Ok(())
}

#[test]
fn test_repl_load_and_sql() -> TestResult {
    let temp_dir = create_temp_dir()?;
    let file = create_custom_csv(temp_dir.path(), "orders.csv", "id,amount\n1,10.5\n2,99\n")?;

    run_test_case(
        SqlaiTestCase {
            args: vec!["-i".into()],
            stdin: Some(format!(
                ".load sales={}\n.sql SELECT SUM(amount) AS total FROM sales\n.sql DELETE FROM sales WHERE id = 1\n.quit\n",
                arg(&file)
            )),
            expected_stdout: vec![
                "Loaded table 'sales' (2 columns, 2 rows)".into(),
                "Using table 'sales'".into(),
                "total\n109.5\n".into(),
                "Query executed successfully".into(),
            ],
            ..Default::default()
        },
        temp_dir.path(),
    )
}

#[test]
fn test_repl_errors_do_not_end_session() -> TestResult {
    let temp_dir = create_temp_dir()?;
    let test_file = prepare_test_file(temp_dir.path())?;

    run_test_case(
        SqlaiTestCase {
            args: vec![arg(&test_file), "-i".into()],
            stdin: Some(
                ".use orders\n.sql SELECT nope FROM people\n.frob\n.sql SELECT COUNT(*) AS n FROM people\n"
                    .into(),
            ),
            expected_stdout: vec!["n\n3\n".into()],
            expected_stderr: vec![
                "Table 'orders' not found".into(),
                "no such column: nope".into(),
                "Unknown command: .frob".into(),
            ],
            ..Default::default()
        },
        temp_dir.path(),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_repl_question() -> TestResult {
    let temp_dir = create_temp_dir()?;
    let test_file = prepare_test_file(temp_dir.path())?;
    let server = FakeModelServer::start(vec![Reply::ok(
        "SELECT name FROM people WHERE age > 28 ORDER BY name",
    )])
    .await;

    run_test_case(
        SqlaiTestCase {
            args: vec![
                arg(&test_file),
                "--endpoint".into(),
                server.endpoint(),
                "-t".into(),
                "people".into(),
                "-i".into(),
            ],
            stdin: Some("who is older than 28?\n.exit\n".into()),
            expected_stdout: vec![
                "SQL: SELECT name FROM people WHERE age > 28 ORDER BY name".into(),
                "Query returned 2 rows".into(),
                "name\nAlice\nCharlie\n".into(),
            ],
            ..Default::default()
        },
        temp_dir.path(),
    )?;

    let (_, user) = server.prompt(0).await;
    assert_eq!(user, "Table: people\nQuestion: who is older than 28?");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_repl_declined_mutation() -> TestResult {
    let temp_dir = create_temp_dir()?;
    let test_file = prepare_test_file(temp_dir.path())?;
    let server = FakeModelServer::start(vec![Reply::ok("DELETE FROM people")]).await;

    run_test_case(
        SqlaiTestCase {
            args: vec![
                arg(&test_file),
                "--endpoint".into(),
                server.endpoint(),
                "-i".into(),
            ],
            stdin: Some("delete everyone\nno\n.sql SELECT COUNT(*) AS n FROM people\n".into()),
            expected_stdout: vec!["Statement not executed".into(), "n\n3\n".into()],
            ..Default::default()
        },
        temp_dir.path(),
    )
}

#[test]
fn test_repl_drops_selection_of_dropped_table() -> TestResult {
    let temp_dir = create_temp_dir()?;
    let test_file = prepare_test_file(temp_dir.path())?;

    run_test_case(
        SqlaiTestCase {
            args: vec![arg(&test_file), "-t".into(), "people".into(), "-i".into()],
            stdin: Some(".sql DROP TABLE people\n.tables\n".into()),
            expected_stdout: vec![
                "Query executed successfully".into(),
                "Table 'people' no longer exists; no table selected".into(),
                "No tables loaded".into(),
            ],
            ..Default::default()
        },
        temp_dir.path(),
    )
}
