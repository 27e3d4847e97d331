//! Command-line answer checker.
//!
//! # Responsibility
//! - Grade an answer file against one stored test and print the JSON report.
//! - Map client errors and server errors to distinct exit codes.
//!
//! Usage: `quizmaker_cli <DB_PATH> <TEST_ID> <ANSWERS>`

use clap::error::ErrorKind;
use clap::Parser;
use log::{error, info};
use quizmaker_core::db::open_db;
use quizmaker_core::{
    init_logging, AnswerSheet, LoggingConfig, SqliteQuestionRepository, SqliteTestRepository,
    TestService, TestServiceError,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use uuid::Uuid;

const EXIT_USAGE: u8 = 2;
const EXIT_CLIENT_ERROR: u8 = 3;
const EXIT_SERVER_ERROR: u8 = 4;

/// Grades an answer file against a stored quiz and prints the score report.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the quiz database file
    db_path: PathBuf,

    /// ID of the test to grade against
    test_id: Uuid,

    /// JSON file mapping question IDs to answers
    answers: PathBuf,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_USAGE),
            };
        }
    };

    match LoggingConfig::from_env() {
        Ok(Some(config)) => {
            if let Err(err) = init_logging(&config) {
                eprintln!("logging disabled: {err}");
            }
        }
        Ok(None) => {}
        Err(err) => eprintln!("logging disabled: {err}"),
    }

    match run(&args) {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(CliError::Service(err)) if err.is_client_error() => {
            eprintln!("{err}");
            ExitCode::from(EXIT_CLIENT_ERROR)
        }
        Err(err) => {
            error!("event=cli_check module=cli status=error");
            eprintln!("{err}");
            ExitCode::from(EXIT_SERVER_ERROR)
        }
    }
}

#[derive(Debug)]
enum CliError {
    Io(String),
    Setup(String),
    Service(TestServiceError),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(message) | Self::Setup(message) => write!(f, "{message}"),
            Self::Service(err) => write!(f, "{err}"),
        }
    }
}

fn run(args: &Args) -> Result<String, CliError> {
    let sheet = read_answers(&args.answers)?;

    let conn = open_db(&args.db_path).map_err(|err| CliError::Setup(err.to_string()))?;
    let tests =
        SqliteTestRepository::try_new(&conn).map_err(|err| CliError::Setup(err.to_string()))?;
    let questions =
        SqliteQuestionRepository::try_new(&conn).map_err(|err| CliError::Setup(err.to_string()))?;
    let service = TestService::new(tests, questions);

    let check = service
        .check_answer_sheet(args.test_id, &sheet)
        .map_err(CliError::Service)?;
    info!(
        "event=cli_check module=cli status=ok percentage={}",
        check.summary.percentage_score
    );

    serde_json::to_string_pretty(&check).map_err(|err| CliError::Setup(err.to_string()))
}

fn read_answers(path: &Path) -> Result<AnswerSheet, CliError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| CliError::Io(format!("cannot read `{}`: {err}", path.display())))?;
    parse_answers(&raw).map_err(CliError::Service)
}

fn parse_answers(raw: &str) -> Result<AnswerSheet, TestServiceError> {
    Ok(AnswerSheet::from_json_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use quizmaker_core::MalformedAnswerPayload;

    const TEST_ID: &str = "67e55044-10b1-426f-9247-bb680e5fe0c8";

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn positional_arguments_are_typed() {
        let args = Args::try_parse_from(["quizmaker_cli", "quiz.db", TEST_ID, "answers.json"])
            .unwrap();
        assert_eq!(args.db_path, PathBuf::from("quiz.db"));
        assert_eq!(args.test_id, Uuid::parse_str(TEST_ID).unwrap());
        assert_eq!(args.answers, PathBuf::from("answers.json"));
    }

    #[test]
    fn bad_test_id_is_a_usage_error() {
        let err = Args::try_parse_from(["quizmaker_cli", "quiz.db", "not-a-uuid", "answers.json"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert_eq!(err.exit_code(), i32::from(EXIT_USAGE));
    }

    #[test]
    fn missing_arguments_are_a_usage_error() {
        let err = Args::try_parse_from(["quizmaker_cli", "quiz.db"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), i32::from(EXIT_USAGE));
    }

    #[test]
    fn unparseable_answers_keep_the_json_error() {
        let err = parse_answers("{not json").unwrap_err();
        assert!(err.is_client_error());
        match &err {
            TestServiceError::MalformedAnswerPayload(MalformedAnswerPayload::InvalidJson(
                detail,
            )) => assert!(!detail.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().starts_with("answers are not valid JSON: "));
    }

    #[test]
    fn answers_file_that_is_not_an_object_is_rejected() {
        let err = parse_answers("[\"Paris\"]").unwrap_err();
        assert!(matches!(
            err,
            TestServiceError::MalformedAnswerPayload(MalformedAnswerPayload::NotAMapping)
        ));
    }

    #[test]
    fn missing_answers_file_is_an_io_error() {
        let dir = std::env::temp_dir().join(format!("quizmaker-cli-{}", std::process::id()));
        let err = read_answers(&dir.join("absent.json")).unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
        assert!(err.to_string().contains("absent.json"));
    }
}
