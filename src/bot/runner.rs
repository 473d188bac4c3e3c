use crate::bot::gateway::{MessagingGateway, TelegramGateway};
use crate::bot::handlers::{self, Command};
use crate::bot::state::{MarketDialogue, State};
use crate::bot::{moderation, views, MarketContext, MessageRef};
use crate::config::Settings;
use crate::market::{CallbackAction, InMemoryListingStore, ListingStore, Seller};
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Recipient};
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

/// Run the Telegram bot until Ctrl-C.
pub async fn run_bot(settings: Arc<Settings>) {
    let bot = Bot::new(settings.telegram_token.clone());

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    let ctx = init_context(&bot, settings);
    let dialogues = InMemStorage::<State>::new();
    let handler = setup_handler();

    info!(
        "Bot is running (moderator chat {}, channel {})...",
        ctx.settings.moderator_chat_id, ctx.settings.channel_id
    );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx, dialogues])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn init_context(bot: &Bot, settings: Arc<Settings>) -> Arc<MarketContext> {
    let gateway: Arc<dyn MessagingGateway> = Arc::new(TelegramGateway::new(bot.clone()));
    let store: Arc<dyn ListingStore> = Arc::new(InMemoryListingStore::new());
    info!("In-memory listing store initialized.");
    Arc::new(MarketContext::new(gateway, store, settings))
}

/// Builds the update routing tree.
#[must_use]
pub fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, InMemStorage<State>, State>()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    // Outside private chats only a pending rejection reason is of interest
                    dptree::filter_async(|msg: Message, ctx: Arc<MarketContext>| async move {
                        msg.text().is_some_and(|t| !t.starts_with('/'))
                            && (msg.chat.is_private() || ctx.rejections.contains(msg.chat.id).await)
                    })
                    .endpoint(handle_text),
                ),
        )
        .branch(
            Update::filter_callback_query()
                .enter_dialogue::<CallbackQuery, InMemStorage<State>, State>()
                .endpoint(handle_callback),
        )
}

async fn handle_command(
    msg: Message,
    cmd: Command,
    dialogue: MarketDialogue,
    ctx: Arc<MarketContext>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start(args) => {
            let restart = args.split_whitespace().any(|arg| arg == "restart");
            handlers::start(&ctx, &dialogue, restart).await
        }
        Command::Help => send_plain(&ctx, &msg, Command::descriptions().to_string()).await,
        Command::Healthcheck => send_plain(&ctx, &msg, "OK".to_string()).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn send_plain(ctx: &MarketContext, msg: &Message, text: String) -> anyhow::Result<()> {
    ctx.gateway
        .send_text(Recipient::Id(msg.chat.id), text, None)
        .await?;
    Ok(())
}

async fn handle_text(
    msg: Message,
    dialogue: MarketDialogue,
    ctx: Arc<MarketContext>,
) -> Result<(), teloxide::RequestError> {
    let Some(text) = msg.text() else {
        return respond(());
    };
    if let Err(e) = handlers::handle_text(&ctx, &dialogue, text).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    dialogue: MarketDialogue,
    ctx: Arc<MarketContext>,
) -> Result<(), teloxide::RequestError> {
    let parsed = q.data.as_deref().map(str::parse::<CallbackAction>);
    let (Some(Ok(action)), Some(message)) = (parsed, q.message.as_ref()) else {
        warn!("Unhandled callback from user {}: {:?}", q.from.id, q.data);
        if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
            warn!("Failed to answer callback: {}", e);
        }
        return respond(());
    };
    let origin = MessageRef {
        chat: message.chat().id,
        message: message.id(),
    };

    if action.is_moderation() && !moderation::is_moderator_chat(&ctx, origin.chat) {
        warn!("User {} pressed {} outside the moderator chat", q.from.id, action);
        if let Err(e) = bot
            .answer_callback_query(q.id.clone())
            .text(views::NOT_ALLOWED)
            .show_alert(true)
            .await
        {
            warn!("Failed to answer callback: {}", e);
        }
        return respond(());
    }

    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!("Failed to answer callback: {}", e);
    }

    let from = Seller {
        id: q.from.id,
        username: q.from.username.clone(),
    };
    if let Err(e) = handlers::handle_callback(&ctx, &dialogue, from, origin, action).await {
        error!("Callback handler error: {}", e);
    }
    respond(())
}
