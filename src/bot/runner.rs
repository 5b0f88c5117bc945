use crate::agent::Orchestrator;
use crate::bot::handlers::{self, Command};
use crate::config::Settings;
use crate::llm::LlmClient;
use crate::storage::{ObjectStore, R2Storage};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

/// Build every collaborator from settings and poll Telegram until Ctrl+C.
///
/// Exits the process if storage, the LLM client or the public URL are not configured.
pub async fn run_bot(settings: Arc<Settings>) {
    let storage = init_storage(&settings).await;
    let llm_client = init_llm(&settings);

    let Some(public_base_url) = settings.r2_public_url.clone() else {
        error!("R2_PUBLIC_URL is missing");
        std::process::exit(1);
    };

    let orchestrator = Arc::new(Orchestrator::new(
        llm_client,
        storage,
        public_base_url,
        settings.max_tool_iterations,
    ));
    info!(
        max_tool_iterations = settings.max_tool_iterations,
        "Orchestrator initialized."
    );

    let bot = Bot::new(settings.telegram_token.clone());
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![orchestrator, settings])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn init_storage(settings: &Settings) -> Arc<dyn ObjectStore> {
    match R2Storage::new(settings).await {
        Ok(s) => {
            info!(bucket = %settings.r2_bucket_name, "R2 Storage initialized.");
            if s.check_connection().await.is_err() {
                error!("R2 Storage connection check returned error.");
            }
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to initialize R2 Storage: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_llm(settings: &Settings) -> Arc<LlmClient> {
    match LlmClient::new(settings) {
        Ok(client) => {
            info!(model = %client.model_id, "LLM Client initialized.");
            Arc::new(client)
        }
        Err(e) => {
            error!("Failed to initialize LLM client: {}", e);
            std::process::exit(1);
        }
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text_message),
        )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => handlers::start(bot, msg).await,
        Command::Help => handlers::help(bot, msg).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text_message(
    bot: Bot,
    msg: Message,
    orchestrator: Arc<Orchestrator>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = Box::pin(handlers::handle_text(bot, msg, orchestrator)).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}
