use quizmaker_core::db::open_db_in_memory;
use quizmaker_core::{
    AnswerSheet, MalformedAnswerPayload, NewQuestion, NewTest, Question, QuestionService,
    QuestionType, SqliteQuestionRepository, SqliteTestRepository, TestId, TestService,
    TestServiceError,
};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

type Service<'conn> = TestService<SqliteTestRepository<'conn>, SqliteQuestionRepository<'conn>>;

fn test_service(conn: &Connection) -> Service<'_> {
    TestService::new(
        SqliteTestRepository::try_new(conn).unwrap(),
        SqliteQuestionRepository::try_new(conn).unwrap(),
    )
}

fn seed_quiz(conn: &Connection) -> (TestId, Vec<Question>) {
    let test = test_service(conn)
        .create_test(&NewTest {
            title: "Mixed".to_string(),
            description: "One of each type".to_string(),
            tags: vec!["demo".to_string()],
        })
        .unwrap();
    let questions = QuestionService::new(SqliteQuestionRepository::try_new(conn).unwrap());

    let payloads = vec![
        NewQuestion {
            kind: QuestionType::Single,
            text: "2 + 2?".to_string(),
            options: Some(vec!["3".to_string(), "4".to_string()]),
            correct_answers: Some(vec!["4".to_string()]),
            points: Some(1),
            ..NewQuestion::default()
        },
        NewQuestion {
            kind: QuestionType::Multiple,
            text: "Pick A and C".to_string(),
            options: Some(vec!["A".to_string(), "B".to_string(), "C".to_string()]),
            correct_answers: Some(vec!["A".to_string(), "C".to_string()]),
            points: Some(2),
            ..NewQuestion::default()
        },
        NewQuestion {
            kind: QuestionType::Text,
            text: "Capital of France?".to_string(),
            correct_answer_text: Some("Paris".to_string()),
            points: Some(3),
            ..NewQuestion::default()
        },
    ];

    let created = payloads
        .into_iter()
        .map(|payload| questions.add_question(test.id, payload).unwrap())
        .collect();
    (test.id, created)
}

#[test]
fn all_correct_answers_score_full_marks() {
    let conn = open_db_in_memory().unwrap();
    let (test_id, questions) = seed_quiz(&conn);
    let answers = json!({
        questions[0].id.to_string(): "4",
        questions[1].id.to_string(): ["C", "A"],
        questions[2].id.to_string(): "  paris ",
    });

    let check = test_service(&conn).check_answers(test_id, &answers).unwrap();

    assert_eq!(check.test_id, test_id);
    assert_eq!(check.summary.total_points, 6);
    assert_eq!(check.summary.earned_points, 6);
    assert_eq!(check.summary.percentage_score, 100);
    assert_eq!(check.summary.correct_count, 3);
    assert_eq!(check.summary.incorrect_count, 0);
    assert_eq!(check.summary.total_questions, 3);
    assert!(check.results.iter().all(|result| result.correct));
}

#[test]
fn partial_answers_round_percentage() {
    let conn = open_db_in_memory().unwrap();
    let (test_id, questions) = seed_quiz(&conn);
    let answers = json!({
        questions[0].id.to_string(): "4",
        questions[1].id.to_string(): ["A"],
    });

    let check = test_service(&conn).check_answers(test_id, &answers).unwrap();

    assert_eq!(check.summary.earned_points, 1);
    assert_eq!(check.summary.total_points, 6);
    assert_eq!(check.summary.percentage_score, 17);
    assert_eq!(check.summary.correct_count, 1);
    assert_eq!(check.summary.incorrect_count, 2);

    let by_question = check
        .results
        .iter()
        .map(|result| (result.question_id, result.correct, result.points_awarded))
        .collect::<Vec<_>>();
    assert_eq!(
        by_question,
        vec![
            (questions[0].id, true, 1),
            (questions[1].id, false, 0),
            (questions[2].id, false, 0),
        ]
    );
}

#[test]
fn scalar_answer_for_multiple_choice_is_coerced() {
    let conn = open_db_in_memory().unwrap();
    let service = test_service(&conn);
    let test = service
        .create_test(&NewTest {
            title: "One answer".to_string(),
            description: "Multiple with a single key".to_string(),
            tags: Vec::new(),
        })
        .unwrap();
    let question = QuestionService::new(SqliteQuestionRepository::try_new(&conn).unwrap())
        .add_question(
            test.id,
            NewQuestion {
                kind: QuestionType::Multiple,
                text: "Pick B".to_string(),
                options: Some(vec!["A".to_string(), "B".to_string()]),
                correct_answers: Some(vec!["B".to_string()]),
                ..NewQuestion::default()
            },
        )
        .unwrap();

    let sheet = AnswerSheet::new().with(question.id, "B");
    let check = service.check_answer_sheet(test.id, &sheet).unwrap();
    assert_eq!(check.summary.percentage_score, 100);
}

#[test]
fn empty_test_scores_zero_percent() {
    let conn = open_db_in_memory().unwrap();
    let service = test_service(&conn);
    let test = service
        .create_test(&NewTest {
            title: "Empty".to_string(),
            description: "No questions yet".to_string(),
            tags: Vec::new(),
        })
        .unwrap();

    let check = service.check_answers(test.id, &json!({})).unwrap();
    assert!(check.results.is_empty());
    assert_eq!(check.summary.total_points, 0);
    assert_eq!(check.summary.percentage_score, 0);
}

#[test]
fn malformed_payload_is_reported_before_missing_test() {
    let conn = open_db_in_memory().unwrap();
    let service = test_service(&conn);

    let err = service
        .check_answers(Uuid::new_v4(), &json!(["not", "a", "map"]))
        .unwrap_err();
    assert!(matches!(
        err,
        TestServiceError::MalformedAnswerPayload(MalformedAnswerPayload::NotAMapping)
    ));
    assert!(err.is_client_error());

    let err = service
        .check_answers(Uuid::new_v4(), &json!({ "q": 7 }))
        .unwrap_err();
    assert!(matches!(
        err,
        TestServiceError::MalformedAnswerPayload(MalformedAnswerPayload::InvalidValue { .. })
    ));
}

#[test]
fn well_formed_answers_for_missing_test_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = test_service(&conn);

    let err = service.check_answers(Uuid::new_v4(), &json!({})).unwrap_err();
    assert!(matches!(err, TestServiceError::TestNotFound(_)));
}

#[test]
fn report_serializes_with_camel_case_keys() {
    let conn = open_db_in_memory().unwrap();
    let (test_id, questions) = seed_quiz(&conn);
    let check = test_service(&conn)
        .check_answers(test_id, &json!({ questions[2].id.to_string(): "PARIS" }))
        .unwrap();

    let value = serde_json::to_value(&check).unwrap();
    assert_eq!(value["testId"], json!(test_id.to_string()));
    assert_eq!(value["summary"]["percentageScore"], json!(50));
    assert_eq!(value["summary"]["earnedPoints"], json!(3));
    assert_eq!(value["results"][2]["pointsAwarded"], json!(3));
    assert_eq!(value["results"][2]["questionId"], json!(questions[2].id.to_string()));
}
