use dotenvy::dotenv;
use pdf_post_bot::bot::handlers::{self, Command};
use pdf_post_bot::caption::CaptionTemplate;
use pdf_post_bot::config::Settings;
use pdf_post_bot::storage::TempStore;
use pdf_post_bot::store::SessionStore;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Load .env file
    dotenv().ok();
    init_logging();

    info!("Starting pdf-post-bot...");

    let settings = init_settings();
    let store = Arc::new(SessionStore::new(settings.default_doc_prefix.clone()));
    let temp = Arc::new(TempStore::new(settings.tmp_root.clone()));
    let template = Arc::new(settings.caption_template());

    let bot = Bot::new(settings.telegram_token.clone());

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        error!("Failed to register bot commands: {}", e);
    }

    info!("Bot is running...");

    Dispatcher::builder(bot, setup_handler())
        .dependencies(dptree::deps![store, temp, template])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_settings() -> Settings {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry().branch(
        Update::filter_message()
            .branch(
                dptree::entry()
                    .filter_command::<Command>()
                    .endpoint(handle_command),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.photo().is_some())
                    .endpoint(handle_photo),
            )
            .branch(dptree::filter(|msg: Message| is_pdf_document(&msg)).endpoint(handle_document))
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.text().is_some_and(|t| !t.starts_with('/')))
                    .endpoint(handle_text),
            ),
    )
}

fn is_pdf_document(msg: &Message) -> bool {
    msg.document().is_some_and(|doc| {
        doc.mime_type
            .as_ref()
            .is_some_and(|mime| mime.essence_str() == "application/pdf")
    })
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    store: Arc<SessionStore>,
    temp: Arc<TempStore>,
    template: Arc<CaptionTemplate>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => handlers::start(bot, msg, store, temp).await,
        Command::SetPrefix => handlers::set_prefix(bot, msg, store).await,
        Command::SetThumbnail => handlers::set_thumbnail(bot, msg).await,
        Command::Finish => handlers::finish(bot, msg, store, temp, template).await,
        Command::Healthcheck => handlers::healthcheck(bot, msg, store).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_photo(
    bot: Bot,
    msg: Message,
    store: Arc<SessionStore>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_photo(bot, msg, store).await {
        error!("Photo handler error: {}", e);
    }
    respond(())
}

async fn handle_document(
    bot: Bot,
    msg: Message,
    store: Arc<SessionStore>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_document(bot, msg, store).await {
        error!("Document handler error: {}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    store: Arc<SessionStore>,
    temp: Arc<TempStore>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_text(bot, msg, store, temp).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}
