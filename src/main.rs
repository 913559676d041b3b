use std::{process, sync::Arc};

use almanac::{
    application::{
        content::{ContentService, LookupOutcome},
        error::{AppError, ContentError},
        media::MediaExternalizer,
        publish::{PublishedTopic, TopicPublisher},
    },
    cache::{CacheConfig, ContentCache},
    config::{self, Command, EntryAction},
    domain::content::{ContentEntry, ContentKind, MediaColumn, NoMedia, Theme, Topic},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        media::{HttpImageFetcher, MediaStorage},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if let AppError::Content(content) = error {
        eprintln!("{}", content.public_message());
    }

    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;

    let repositories = Arc::new(PostgresRepositories::from_settings(&settings.database).await?);

    match cli_args.command {
        Command::Migrate => run_migrations(&repositories).await,
        Command::Topic(args) => {
            let app = build_application(&settings, repositories)?;
            run_topic(&app, args.action).await.map_err(AppError::from)
        }
        Command::Theme(args) => {
            let app = build_application(&settings, repositories)?;
            run_theme(&app.themes, args.action)
                .await
                .map_err(AppError::from)
        }
    }
}

async fn run_migrations(repositories: &PostgresRepositories) -> Result<(), AppError> {
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| InfraError::database(format!("migration failed: {err}")))?;
    info!("database migrations applied");
    println!("Migrations applied.");
    Ok(())
}

struct Application {
    themes: ContentService<Theme>,
    publisher: TopicPublisher,
}

fn build_application(
    settings: &config::Settings,
    repositories: Arc<PostgresRepositories>,
) -> Result<Application, AppError> {
    let cache = Arc::new(ContentCache::new(CacheConfig::from(&settings.cache)));
    let fetcher = Arc::new(HttpImageFetcher::from_settings(&settings.media)?);
    let storage = Arc::new(MediaStorage::from_settings(&settings.media));

    let themes = ContentService::<Theme>::new(repositories.clone(), cache.clone());
    let topics = ContentService::<Topic>::new(repositories, cache);
    let publisher = TopicPublisher::new(topics, MediaExternalizer::new(fetcher, storage));

    Ok(Application { themes, publisher })
}

async fn run_topic(app: &Application, action: EntryAction) -> Result<(), ContentError> {
    match action {
        EntryAction::Add { keyword, content } => {
            let published = app.publisher.create(&keyword, &content).await?;
            print_published("created", &published);
            Ok(())
        }
        EntryAction::Update { keyword, content } => {
            let published = app.publisher.update(&keyword, &content).await?;
            print_published("updated", &published);
            Ok(())
        }
        other => run_read_or_remove(app.publisher.topics(), other).await,
    }
}

async fn run_theme(themes: &ContentService<Theme>, action: EntryAction) -> Result<(), ContentError> {
    match action {
        EntryAction::Add { keyword, content } => {
            themes.create(&keyword, &content, NoMedia).await?;
            println!("Theme `{}` created.", keyword.trim());
            Ok(())
        }
        EntryAction::Update { keyword, content } => {
            themes.update(&keyword, &content, NoMedia).await?;
            println!("Theme `{}` updated.", keyword.trim());
            Ok(())
        }
        other => run_read_or_remove(themes, other).await,
    }
}

/// Actions that behave the same for every kind.
async fn run_read_or_remove<K: ContentKind>(
    service: &ContentService<K>,
    action: EntryAction,
) -> Result<(), ContentError> {
    match action {
        EntryAction::Remove { keyword } => {
            service.delete(&keyword).await?;
            println!("{} `{}` removed.", capitalized(K::NAME), keyword.trim());
        }
        EntryAction::Show { query } => match service.lookup(&query).await? {
            LookupOutcome::NoMatch => println!("No {} matches `{}`.", K::NAME, query.trim()),
            LookupOutcome::Found(entry) => print_entry(&entry),
            LookupOutcome::Ambiguous(keywords) => {
                println!("Several {}s match `{}`:", K::NAME, query.trim());
                for keyword in keywords {
                    println!("  {keyword}");
                }
            }
        },
        EntryAction::Search { pattern } => {
            let entries = service.search_pattern(&pattern).await?;
            if entries.is_empty() {
                println!("No {} matches `{}`.", K::NAME, pattern.trim());
            }
            for entry in &entries {
                println!("[{}]", entry.keyword);
                print_entry(entry);
            }
        }
        EntryAction::List => {
            for keyword in service.list_keywords().await? {
                println!("{keyword}");
            }
        }
        EntryAction::Exists { keyword } => {
            println!("{}", service.has_keyword(&keyword).await?);
        }
        EntryAction::Add { .. } | EntryAction::Update { .. } => {
            return Err(ContentError::Validation(
                "add and update are handled per kind".to_string(),
            ));
        }
    }
    Ok(())
}

fn print_entry<K: ContentKind>(entry: &ContentEntry<K>) {
    println!("{}", entry.value);
    if let Some(images) = entry.media.encode().filter(|joined| !joined.is_empty()) {
        println!("images: {images}");
    }
}

fn print_published(verb: &str, published: &PublishedTopic) {
    println!("Topic `{}` {verb}.", published.keyword);
    println!("{}", published.content);
    if !published.images.is_empty() {
        println!("images: {}", published.images.joined());
    }
}

fn capitalized(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
