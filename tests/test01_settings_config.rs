use std::collections::HashMap;
use std::fs;

use mssql_sqlfile::config::{DB_DATABASE, DB_DRIVER, DB_PASSWORD, DB_SERVER, DB_USER};
use mssql_sqlfile::{ConnectionConfig, Database, SettingsFile, SqlFileError};
use tempfile::tempdir;

const FULL_SETTINGS: &str = "\
# local development server
DB_DRIVER=ODBC Driver 18 for SQL Server
DB_SERVER=file-host,1433
DB_DATABASE=file_db
DB_USER=file_user
DB_PASSWORD=file_pwd
";

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn file_values_fill_gaps_and_env_wins() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("db.env");
    fs::write(&path, FULL_SETTINGS)?;
    let settings = SettingsFile::load(&path)?;
    assert_eq!(settings.get(DB_DRIVER), Some("ODBC Driver 18 for SQL Server"));

    let config = ConnectionConfig::resolve_with(
        env_of(&[(DB_SERVER, "env-host"), (DB_USER, "")]),
        Some(&settings),
    )?;
    assert_eq!(config.server, "env-host");
    // empty in the environment counts as unset
    assert_eq!(config.user, "file_user");
    assert_eq!(config.database, "file_db");
    Ok(())
}

#[test]
fn missing_values_are_all_reported() {
    let err = ConnectionConfig::resolve_with(
        env_of(&[(DB_DRIVER, "FreeTDS"), (DB_SERVER, "db01"), (DB_USER, "sa")]),
        None,
    )
    .unwrap_err();
    match err {
        SqlFileError::MissingConfiguration(missing) => {
            assert_eq!(missing, vec![DB_DATABASE, DB_PASSWORD]);
        }
        other => panic!("expected MissingConfiguration, got {other:?}"),
    }
}

#[test]
fn explicit_missing_settings_file_is_an_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent.env");
    let err = SettingsFile::load(&missing).unwrap_err();
    assert!(matches!(err, SqlFileError::SettingsFileNotFound(ref p) if p == &missing));

    let err = Database::builder()
        .settings_file(&missing)
        .resolve_config()
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn absent_default_file_is_not_an_error() {
    let dir = tempdir().unwrap();
    assert!(SettingsFile::load_default_in(dir.path()).unwrap().is_none());

    fs::write(dir.path().join(".env"), "DB_SERVER=from-default\n").unwrap();
    let settings = SettingsFile::load_default_in(dir.path()).unwrap().unwrap();
    assert_eq!(settings.get(DB_SERVER), Some("from-default"));
}

#[test]
fn malformed_settings_line_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.env");
    fs::write(&path, "DB_SERVER=ok\nthis line has no separator\n").unwrap();
    match SettingsFile::load(&path) {
        Err(SqlFileError::SettingsError(msg)) => assert!(msg.contains("line 2")),
        other => panic!("expected SettingsError, got {other:?}"),
    }
}

#[test]
fn settings_can_be_handed_to_a_child_process() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("child.env");
    // PATH is always set in the parent, so it must not be exported
    fs::write(
        &path,
        "MSSQL_SQLFILE_T01_DB_SERVER=child-host\nMSSQL_SQLFILE_T01_DB_USER=child_user\nPATH=/nowhere\n",
    )
    .unwrap();
    let settings = SettingsFile::load(&path).unwrap();

    let mut command = std::process::Command::new("true");
    settings.apply_to_command(&mut command);
    let mut exported: Vec<(String, String)> = command
        .get_envs()
        .filter_map(|(k, v)| Some((k.to_str()?.to_string(), v?.to_str()?.to_string())))
        .collect();
    exported.sort();

    assert_eq!(
        exported,
        vec![
            ("MSSQL_SQLFILE_T01_DB_SERVER".to_string(), "child-host".to_string()),
            ("MSSQL_SQLFILE_T01_DB_USER".to_string(), "child_user".to_string()),
        ]
    );
}
