use std::error::Error;

use services::{AppServices, Clock, Dashboard};
use storage::repository::{CategoryRepository, Storage};
use study_core::model::{CategoryId, Question, QuizDraft, QuizId, UserId};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod answers;
mod config;

use answers::parse_answers;
use config::{AppConfig, ENV_USER_ID, prepare_sqlite_file};

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- seed                       [flags]");
    eprintln!("  cargo run -p app -- categories                 [flags]");
    eprintln!("  cargo run -p app -- dashboard                  [flags]");
    eprintln!("  cargo run -p app -- take <quiz-id> <answers>   [flags]   # answers: 0=1;1=0,2");
    eprintln!("  cargo run -p app -- decks                      [flags]");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --db <sqlite_url>   (default sqlite://study.sqlite3)");
    eprintln!("  --user <uuid>");
    eprintln!("  --timeout-ms <ms>   (default 10000)");
    eprintln!();
    eprintln!("Environment (.env is read when present):");
    eprintln!("  STUDY_DB_URL, STUDY_USER_ID, STUDY_STORE_TIMEOUT_MS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Seed,
    Categories,
    Dashboard,
    Take,
    Decks,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "seed" => Some(Self::Seed),
            "categories" => Some(Self::Categories),
            "dashboard" => Some(Self::Dashboard),
            "take" => Some(Self::Take),
            "decks" => Some(Self::Decks),
            _ => None,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn invalid_input(msg: impl Into<String>) -> Box<dyn Error> {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, msg.into()).into()
}

async fn run() -> Result<(), Box<dyn Error>> {
    let mut argv = std::env::args().skip(1);
    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            invalid_input("unknown subcommand")
        })?,
    };

    let mut config = AppConfig::from_env()?;
    let positional = config.apply_args(argv).inspect_err(|e| {
        eprintln!("{e}");
        print_usage();
    })?;

    // Open + migrate SQLite here so library crates stay free of process setup.
    prepare_sqlite_file(&config.db_url)?;
    let storage = Storage::sqlite(&config.db_url).await?;
    let services = AppServices::from_storage(&storage, Clock::system(), config.deadline());
    info!(db = %config.db_url, timeout_ms = config.store_timeout.as_millis(), "storage ready");

    let user = match (cmd, config.user_id) {
        (_, Some(user)) => user,
        (Command::Seed, None) => {
            let user = UserId::random();
            println!("seeding for new user {user}");
            println!("  export {ENV_USER_ID}={user}");
            user
        }
        (_, None) => {
            return Err(invalid_input(format!(
                "no user configured; set {ENV_USER_ID} or pass --user"
            )));
        }
    };
    services.session().sign_in(user);

    match cmd {
        Command::Seed => seed(&storage, &services).await,
        Command::Categories => {
            for category in services.quiz_service().list_categories().await? {
                println!("{:>4}  {}", category.id.to_string(), category.title);
            }
            Ok(())
        }
        Command::Dashboard => {
            let dashboard = services.dashboard_service().load_dashboard(user).await?;
            print_dashboard(&dashboard);
            Ok(())
        }
        Command::Take => {
            let [quiz, answers] = positional.as_slice() else {
                return Err(invalid_input("take expects <quiz-id> <answers>"));
            };
            let quiz_id: QuizId = quiz.parse()?;
            let submission = parse_answers(answers)?;
            let outcome = services
                .scoring_service()
                .submit_attempt(quiz_id, &submission)
                .await?;

            for (i, ok) in outcome.score.question_results().iter().enumerate() {
                println!("  question {i}: {}", if *ok { "correct" } else { "wrong" });
            }
            println!(
                "score {}/{} ({}%), attempt #{}",
                outcome.score.correct_count,
                outcome.score.total_questions,
                outcome.score.score_percent,
                outcome.stats.attempt_count()
            );
            Ok(())
        }
        Command::Decks => {
            let cards = services.card_service();
            for group in services.deck_service().decks_by_category().await? {
                println!("{}", group.category);
                for deck in group.decks {
                    let count = cards.list_cards(deck.id()).await?.len();
                    println!("  {:>4}  {} ({count} cards)", deck.id().to_string(), deck.title());
                }
            }
            Ok(())
        }
    }
}

fn print_dashboard(dashboard: &Dashboard) {
    if dashboard.is_empty() {
        println!("no quizzes yet; try `seed`");
        return;
    }
    for group in dashboard.groups() {
        println!("{}", group.title);
        for quiz in &group.quizzes {
            let last = quiz
                .last_tried
                .map_or_else(|| "never".to_owned(), |t| t.format("%Y-%m-%d %H:%M").to_string());
            println!(
                "  {:>4}  {:<28} {:>2} questions  {:>3}%  tries {}  last {}",
                quiz.id.to_string(),
                quiz.title,
                quiz.question_count,
                quiz.progress,
                quiz.try_number,
                last
            );
        }
    }
}

async fn ensure_category(storage: &Storage, title: &str) -> Result<CategoryId, Box<dyn Error>> {
    let existing = storage.categories.list_categories().await?;
    if let Some(found) = existing.iter().find(|c| c.title == title) {
        return Ok(found.id);
    }
    Ok(storage.categories.insert_category(title).await?)
}

async fn seed(storage: &Storage, services: &AppServices) -> Result<(), Box<dyn Error>> {
    let geography = ensure_category(storage, "Géographie").await?;
    let maths = ensure_category(storage, "Mathématiques").await?;

    let quizzes = services.quiz_service();
    let capitals = quizzes
        .create_quiz(QuizDraft {
            title: "Capitales européennes".into(),
            category_id: Some(geography),
            questions: vec![
                Question::new(
                    "Capitale de l'Espagne ?",
                    vec!["Barcelone".into(), "Madrid".into(), "Séville".into()],
                    [1],
                ),
                Question::new(
                    "Lesquelles sont des capitales ?",
                    vec!["Berlin".into(), "Munich".into(), "Vienne".into()],
                    [0, 2],
                ),
                Question::new(
                    "Capitale du Portugal ?",
                    vec!["Porto".into(), "Lisbonne".into()],
                    [1],
                ),
            ],
        })
        .await?;
    let mental = quizzes
        .create_quiz(QuizDraft {
            title: "Calcul mental".into(),
            category_id: Some(maths),
            questions: vec![
                Question::new("2+2 ?", vec!["3".into(), "4".into(), "5".into()], [1]),
                Question::new(
                    "Nombres pairs ?",
                    vec!["3".into(), "8".into(), "12".into(), "15".into()],
                    [1, 2],
                ),
            ],
        })
        .await?;

    let deck = services
        .deck_service()
        .create_deck("Langues", "Espagnol")
        .await?;
    let cards = services.card_service();
    for (front, back) in [("hola", "bonjour"), ("gracias", "merci"), ("adiós", "au revoir")] {
        cards.create_card(deck, front, back).await?;
    }

    println!("seeded quizzes {capitals} and {mental}, deck {deck}");
    Ok(())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
