use std::fmt;

use chrono::{DateTime, Duration, Utc};
use quiz_core::model::{
    Category, Difficulty, Question, QuestionId, QuizSession, ScoreTally, SessionId,
};
use sqlx::Row;
use storage::repository::{NewAnswerRecord, NewQuestionRecord, NewSessionRecord};
use storage::sqlite::SqliteRepository;
use storage::{AnswerRepository, QuestionRepository, SessionRepository};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    force: bool,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite:quiz.sqlite3".into());
        let mut force = std::env::var("QUIZ_SEED_FORCE")
            .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--force" => force = true,
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, force, now })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:quiz.sqlite3)");
    eprintln!("  --force                   Wipe answers, sessions, and questions first");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_SEED_FORCE");
}

struct SampleQuestion {
    prompt: &'static str,
    options: &'static [&'static str],
    correct_index: u32,
    explanation: &'static str,
    category: Category,
    difficulty: Difficulty,
}

const SAMPLE_QUESTIONS: &[SampleQuestion] = &[
    SampleQuestion {
        prompt: "¿Qué es un ORM?",
        options: &[
            "Un gestor de paquetes",
            "Una técnica para mapear objetos a tablas",
            "Un servidor web",
            "Una base de datos",
        ],
        correct_index: 1,
        explanation: "Un ORM traduce entre objetos del programa y filas de una base de datos relacional",
        category: Category::Tecnologia,
        difficulty: Difficulty::Facil,
    },
    SampleQuestion {
        prompt: "¿Cuál es la complejidad temporal de una búsqueda binaria?",
        options: &["O(n)", "O(n²)", "O(log n)", "O(n log n)"],
        correct_index: 2,
        explanation: "La búsqueda binaria divide el problema por la mitad en cada iteración",
        category: Category::Tecnologia,
        difficulty: Difficulty::Medio,
    },
    SampleQuestion {
        prompt: "¿Qué significa CORS?",
        options: &[
            "Cross-Origin Request System",
            "Cross-Origin Resource Sharing",
            "Cross-Object Request Support",
            "Coordinated Origin Resource System",
        ],
        correct_index: 1,
        explanation: "CORS permite que recursos de un dominio accedan a recursos de otro dominio",
        category: Category::Tecnologia,
        difficulty: Difficulty::Dificil,
    },
    SampleQuestion {
        prompt: "¿En qué año cayó el Muro de Berlín?",
        options: &["1987", "1989", "1991", "1993"],
        correct_index: 1,
        explanation: "El Muro de Berlín cayó el 9 de noviembre de 1989",
        category: Category::Historia,
        difficulty: Difficulty::Medio,
    },
    SampleQuestion {
        prompt: "¿Quién fue el primer presidente de los Estados Unidos?",
        options: &[
            "Thomas Jefferson",
            "George Washington",
            "John Adams",
            "Benjamin Franklin",
        ],
        correct_index: 1,
        explanation: "George Washington gobernó de 1789 a 1797",
        category: Category::Historia,
        difficulty: Difficulty::Facil,
    },
    SampleQuestion {
        prompt: "¿Cuál es el elemento químico más abundante en el universo?",
        options: &["Oxígeno", "Helio", "Hidrógeno", "Carbono"],
        correct_index: 2,
        explanation: "El hidrógeno forma la mayoría de las estrellas",
        category: Category::Ciencia,
        difficulty: Difficulty::Medio,
    },
    SampleQuestion {
        prompt: "¿Cuál es la unidad básica de la vida?",
        options: &["Átomo", "Molécula", "Célula", "Tejido"],
        correct_index: 2,
        explanation: "Todos los organismos vivos están compuestos de células",
        category: Category::Ciencia,
        difficulty: Difficulty::Facil,
    },
    SampleQuestion {
        prompt: "¿Cuál es la capital de Francia?",
        options: &["Lyon", "Marsella", "París", "Toulouse"],
        correct_index: 2,
        explanation: "París es la capital y ciudad más grande de Francia",
        category: Category::Geografia,
        difficulty: Difficulty::Facil,
    },
    SampleQuestion {
        prompt: "¿Cuál es el río más largo del mundo?",
        options: &["Amazonas", "Nilo", "Yangtsé", "Misisipi"],
        correct_index: 1,
        explanation: "El Nilo mide aproximadamente 6.650 km",
        category: Category::Geografia,
        difficulty: Difficulty::Medio,
    },
    SampleQuestion {
        prompt: "¿Quién escribió 'Cien años de soledad'?",
        options: &[
            "Mario Vargas Llosa",
            "Gabriel García Márquez",
            "Julio Cortázar",
            "Jorge Luis Borges",
        ],
        correct_index: 1,
        explanation: "García Márquez la publicó en 1967",
        category: Category::Literatura,
        difficulty: Difficulty::Facil,
    },
    SampleQuestion {
        prompt: "¿Cada cuántos años se celebran los Juegos Olímpicos de verano?",
        options: &["2", "3", "4", "5"],
        correct_index: 2,
        explanation: "Se celebran cada cuatro años desde 1896",
        category: Category::Deporte,
        difficulty: Difficulty::Facil,
    },
    SampleQuestion {
        prompt: "¿Cuántos jugadores tiene un equipo de fútbol en el campo?",
        options: &["9", "10", "11", "12"],
        correct_index: 2,
        explanation: "Once jugadores, incluido el portero",
        category: Category::Deporte,
        difficulty: Difficulty::Facil,
    },
];

// (player, question offsets into the sample set, selected option per question)
const SAMPLE_SESSIONS: &[(&str, &[usize], &[u32])] = &[
    ("Juan Pérez", &[0, 1, 2, 3, 4], &[1, 2, 1, 2, 1]),
    ("María García", &[5, 6, 7, 8, 9], &[1, 1, 1, 2, 2]),
    ("Carlos López", &[7, 8, 9, 10, 11], &[2, 1, 1, 1, 2]),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let repo = SqliteRepository::connect(&args.db_url).await?;
    repo.migrate().await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let existing: i64 = sqlx::query("SELECT COUNT(*) AS n FROM questions")
        .fetch_one(repo.pool())
        .await?
        .try_get("n")?;

    if existing > 0 && !args.force {
        println!("Database already contains data; skipping seed (use --force to reseed)");
        return Ok(());
    }

    if args.force {
        // answers first so the foreign keys stay satisfied throughout
        sqlx::query("DELETE FROM answers").execute(repo.pool()).await?;
        sqlx::query("DELETE FROM quiz_sessions")
            .execute(repo.pool())
            .await?;
        sqlx::query("DELETE FROM questions")
            .execute(repo.pool())
            .await?;
    }

    let mut records = Vec::with_capacity(SAMPLE_QUESTIONS.len());
    for sample in SAMPLE_QUESTIONS {
        let question = Question::new(
            QuestionId::new(1),
            sample.prompt,
            sample.options.iter().map(|&o| o.to_owned()).collect(),
            sample.correct_index,
            Some(sample.explanation.to_owned()),
            sample.category,
            sample.difficulty,
            now,
        )?;
        records.push(NewQuestionRecord::from_question(&question));
    }
    let question_ids = repo.insert_questions(records).await?;

    let mut questions = Vec::with_capacity(question_ids.len());
    for id in &question_ids {
        let question = repo
            .get_question(*id)
            .await?
            .ok_or("seeded question went missing")?;
        questions.push(question);
    }

    for (index, (player, offsets, selections)) in SAMPLE_SESSIONS.iter().enumerate() {
        let started_at = now - Duration::days(i64::try_from(index)? + 1);
        let draft = QuizSession::start(SessionId::new(1), Some((*player).into()), started_at);
        let session_id = repo
            .insert_session(NewSessionRecord::from_session(&draft))
            .await?;

        let mut answers = Vec::new();
        for (offset, selected) in offsets.iter().zip(selections.iter()) {
            let question = &questions[*offset];
            let is_correct = question.grade(*selected)?;
            let response_secs = 10 + (i64::try_from(*offset)? % 5) * 3;

            let answer_id = repo
                .insert_answer(NewAnswerRecord {
                    session_id,
                    question_id: question.id(),
                    selected_index: *selected,
                    is_correct,
                    response_secs: Some(response_secs),
                    created_at: started_at,
                })
                .await?;
            let answer = repo
                .get_answer(answer_id)
                .await?
                .ok_or("seeded answer went missing")?;
            answers.push(answer);
        }

        let mut session = repo
            .get_session(session_id)
            .await?
            .ok_or("seeded session went missing")?;
        let tally = ScoreTally::from_answers(&answers)?;
        session.complete(&tally, started_at + Duration::hours(1));
        repo.update_session(&session).await?;
    }

    println!(
        "Seeded {} questions and {} completed sessions into {}",
        question_ids.len(),
        SAMPLE_SESSIONS.len(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
