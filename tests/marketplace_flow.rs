use account_market_bot::bot::gateway::{GatewayError, MessagingGateway};
use account_market_bot::bot::{handlers, views, MarketContext, MarketDialogue, MessageRef, State};
use account_market_bot::config::Settings;
use account_market_bot::market::{
    CallbackAction, InMemoryListingStore, ListingId, ListingStore, Platform, Seller,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::types::{
    ChatId, InlineKeyboardButtonKind, InlineKeyboardMarkup, MessageId, Recipient, UserId,
};
use teloxide::{ApiError, RequestError};

const SELLER_CHAT: ChatId = ChatId(100);
const MODERATOR_CHAT: ChatId = ChatId(1);

#[derive(Debug, Clone)]
enum Outbound {
    Sent {
        id: MessageId,
        to: Recipient,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    Edited {
        chat: ChatId,
        message: MessageId,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
}

/// Gateway fake that records every outbound call.
#[derive(Default)]
struct RecordingGateway {
    log: Mutex<Vec<Outbound>>,
    unreachable: Mutex<Vec<Recipient>>,
    next_id: AtomicI32,
}

impl RecordingGateway {
    fn block(&self, to: Recipient) {
        self.unreachable.lock().expect("lock").push(to);
    }

    fn unblock_all(&self) {
        self.unreachable.lock().expect("lock").clear();
    }

    fn outbound(&self) -> Vec<Outbound> {
        self.log.lock().expect("lock").clone()
    }

    fn texts_sent_to(&self, to: &Recipient) -> Vec<String> {
        self.outbound()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Sent { to: t, text, .. } if &t == to => Some(text),
                _ => None,
            })
            .collect()
    }

    fn last_sent_to(&self, to: &Recipient) -> (MessageId, String, Option<InlineKeyboardMarkup>) {
        self.outbound()
            .into_iter()
            .rev()
            .find_map(|o| match o {
                Outbound::Sent {
                    id,
                    to: t,
                    text,
                    keyboard,
                } if &t == to => Some((id, text, keyboard)),
                _ => None,
            })
            .expect("a message was sent")
    }

    fn last_edit(&self) -> (ChatId, MessageId, String, Option<InlineKeyboardMarkup>) {
        self.outbound()
            .into_iter()
            .rev()
            .find_map(|o| match o {
                Outbound::Edited {
                    chat,
                    message,
                    text,
                    keyboard,
                } => Some((chat, message, text, keyboard)),
                Outbound::Sent { .. } => None,
            })
            .expect("a message was edited")
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send_text(
        &self,
        to: Recipient,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, GatewayError> {
        if self.unreachable.lock().expect("lock").contains(&to) {
            return Err(RequestError::Api(ApiError::BotBlocked).into());
        }
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.log.lock().expect("lock").push(Outbound::Sent {
            id,
            to,
            text,
            keyboard,
        });
        Ok(id)
    }

    async fn edit_text(
        &self,
        chat: ChatId,
        message: MessageId,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), GatewayError> {
        self.log.lock().expect("lock").push(Outbound::Edited {
            chat,
            message,
            text,
            keyboard,
        });
        Ok(())
    }

    async fn bot_username(&self) -> Result<String, GatewayError> {
        Ok("market_bot".to_string())
    }
}

struct Harness {
    gateway: Arc<RecordingGateway>,
    store: Arc<InMemoryListingStore>,
    ctx: MarketContext,
    seller: MarketDialogue,
    moderator: MarketDialogue,
}

impl Harness {
    fn new() -> Self {
        let gateway = Arc::new(RecordingGateway::default());
        let store = Arc::new(InMemoryListingStore::new());
        let settings = Settings {
            telegram_token: "dummy".to_string(),
            moderator_chat_id: MODERATOR_CHAT.0,
            channel_id: "@market".to_string(),
        };
        let ctx = MarketContext::new(gateway.clone(), store.clone(), Arc::new(settings));
        let dialogues = InMemStorage::<State>::new();
        Self {
            gateway,
            store,
            ctx,
            seller: Dialogue::new(dialogues.clone(), SELLER_CHAT),
            moderator: Dialogue::new(dialogues, MODERATOR_CHAT),
        }
    }

    fn seller_identity() -> Seller {
        Seller {
            id: UserId(100),
            username: Some("seller".to_string()),
        }
    }

    async fn seller_state(&self) -> Option<State> {
        self.seller.get().await.expect("dialogue storage")
    }

    async fn press(&self, dialogue: &MarketDialogue, message: MessageId, action: CallbackAction) {
        let origin = MessageRef {
            chat: dialogue.chat_id(),
            message,
        };
        handlers::handle_callback(&self.ctx, dialogue, Self::seller_identity(), origin, action)
            .await
            .expect("callback handled");
    }

    async fn type_text(&self, dialogue: &MarketDialogue, text: &str) {
        handlers::handle_text(&self.ctx, dialogue, text)
            .await
            .expect("text handled");
    }

    /// Walks the seller form up to the summary and returns the summary message.
    async fn fill_form(&self) -> MessageId {
        let seller = Recipient::Id(SELLER_CHAT);
        handlers::start(&self.ctx, &self.seller, false)
            .await
            .expect("start");
        let (welcome, _, _) = self.gateway.last_sent_to(&seller);
        self.press(&self.seller, welcome, CallbackAction::Platform(Platform::Instagram))
            .await;
        self.type_text(&self.seller, "johndoe").await;
        self.type_text(&self.seller, "1500").await;
        self.type_text(&self.seller, "9.99").await;
        let (summary, _, _) = self.gateway.last_sent_to(&seller);
        summary
    }

    /// Submits a listing and returns its id plus the moderator's message.
    async fn submit(&self) -> (ListingId, MessageId) {
        let summary = self.fill_form().await;
        self.press(&self.seller, summary, CallbackAction::Confirm).await;

        let (message, _, keyboard) = self.gateway.last_sent_to(&Recipient::Id(MODERATOR_CHAT));
        let keyboard = keyboard.expect("moderation buttons");
        let Some(InlineKeyboardButtonKind::CallbackData(data)) =
            keyboard.inline_keyboard.first().and_then(|row| row.first()).map(|b| b.kind.clone())
        else {
            panic!("approve button carries callback data");
        };
        let Ok(CallbackAction::Approve(id)) = data.parse::<CallbackAction>() else {
            panic!("unexpected callback data {data}");
        };
        (id, message)
    }
}

#[tokio::test]
async fn completed_form_reaches_moderator() {
    let h = Harness::new();
    let (id, _) = h.submit().await;

    assert_eq!(h.store.len().await, 1);
    let listing = h.store.get(&id).await.expect("listing stored");
    assert_eq!(listing.platform, Platform::Instagram);
    assert_eq!(listing.account_handle, "johndoe");
    assert_eq!(listing.follower_count, 1500);
    assert_eq!(listing.price.to_string(), "$9.99");
    assert_eq!(listing.seller.username.as_deref(), Some("seller"));

    let (_, submission, _) = h.gateway.last_sent_to(&Recipient::Id(MODERATOR_CHAT));
    assert!(submission.starts_with("📮 New Ad Submission:"));
    assert!(submission.contains(id.as_str()));

    let (chat, _, text, keyboard) = h.gateway.last_edit();
    assert_eq!(chat, SELLER_CHAT);
    assert_eq!(text, views::SUBMITTED);
    assert_eq!(keyboard, views::back_to_menu_keyboard("market_bot"));
    assert_eq!(h.seller_state().await, Some(State::Idle));
}

#[tokio::test]
async fn approval_publishes_and_notifies_seller() {
    let h = Harness::new();
    let (id, message) = h.submit().await;

    h.press(&h.moderator, message, CallbackAction::Approve(id.clone()))
        .await;

    let posts = h
        .gateway
        .texts_sent_to(&Recipient::ChannelUsername("@market".to_string()));
    assert_eq!(posts.len(), 1);
    assert!(posts[0].contains("🆔 Username: @johndoe"));
    assert!(posts[0].contains("🤝 Seller: @seller"));

    let notices = h.gateway.texts_sent_to(&Recipient::Id(SELLER_CHAT));
    assert_eq!(
        notices.last().map(String::as_str),
        Some(views::published_notice(Some("https://t.me/market")).as_str())
    );
    assert_eq!(h.store.len().await, 0);
}

#[tokio::test]
async fn rejection_relays_reason_to_seller() {
    let h = Harness::new();
    let (id, message) = h.submit().await;

    h.press(&h.moderator, message, CallbackAction::Reject(id.clone()))
        .await;
    let (_, _, prompt, _) = h.gateway.last_edit();
    assert_eq!(prompt, views::ask_reject_reason(&id));
    assert_eq!(h.store.len().await, 1, "listing stays until the reason arrives");

    h.type_text(&h.moderator, "fake followers").await;

    let seller_texts = h.gateway.texts_sent_to(&Recipient::Id(SELLER_CHAT));
    assert_eq!(
        seller_texts.last().map(String::as_str),
        Some("❌ Your ad was rejected!\n📝 Reason: fake followers")
    );
    let (_, ack, _) = h.gateway.last_sent_to(&Recipient::Id(MODERATOR_CHAT));
    assert_eq!(ack, views::REASON_SENT);
    assert_eq!(h.store.len().await, 0);
    assert!(!h.ctx.rejections.contains(MODERATOR_CHAT).await);
}

#[tokio::test]
async fn invalid_input_keeps_stage_and_fields() {
    let h = Harness::new();
    let seller = Recipient::Id(SELLER_CHAT);
    handlers::start(&h.ctx, &h.seller, false).await.expect("start");
    let (welcome, _, _) = h.gateway.last_sent_to(&seller);
    h.press(&h.seller, welcome, CallbackAction::Platform(Platform::Twitter))
        .await;
    h.type_text(&h.seller, "jack").await;

    for bad in ["abc", "-5", "12.5"] {
        h.type_text(&h.seller, bad).await;
        let (_, text, _) = h.gateway.last_sent_to(&seller);
        assert_eq!(text, views::INVALID_FOLLOWERS, "input {bad:?}");
        assert_eq!(
            h.seller_state().await,
            Some(State::Followers {
                platform: Platform::Twitter,
                account_handle: "jack".to_string(),
            })
        );
    }

    h.type_text(&h.seller, "0").await;
    for bad in ["0.5", "1", "free"] {
        h.type_text(&h.seller, bad).await;
        let (_, text, _) = h.gateway.last_sent_to(&seller);
        assert_eq!(text, views::INVALID_PRICE, "input {bad:?}");
        assert!(matches!(
            h.seller_state().await,
            Some(State::Price { follower_count: 0, .. })
        ));
    }

    h.type_text(&h.seller, "1.01").await;
    assert!(matches!(
        h.seller_state().await,
        Some(State::Confirmation { .. })
    ));
}

#[tokio::test]
async fn second_approval_sees_not_found() {
    let h = Harness::new();
    let (id, message) = h.submit().await;

    h.press(&h.moderator, message, CallbackAction::Approve(id.clone()))
        .await;
    h.press(&h.moderator, message, CallbackAction::Approve(id.clone()))
        .await;

    let (_, _, text, _) = h.gateway.last_edit();
    assert_eq!(text, views::NOT_FOUND);
    let posts = h
        .gateway
        .texts_sent_to(&Recipient::ChannelUsername("@market".to_string()));
    assert_eq!(posts.len(), 1);
}

#[tokio::test]
async fn restart_link_discards_progress() {
    let h = Harness::new();
    h.fill_form().await;

    handlers::start(&h.ctx, &h.seller, true).await.expect("restart");

    let texts = h.gateway.texts_sent_to(&Recipient::Id(SELLER_CHAT));
    let tail: Vec<&str> = texts.iter().rev().take(2).rev().map(String::as_str).collect();
    assert_eq!(tail, vec![views::SESSION_RESET, views::WELCOME]);
    assert_eq!(h.seller_state().await, Some(State::Platform));
    assert_eq!(h.store.len().await, 0);
}

#[tokio::test]
async fn edit_again_returns_to_platform_choice() {
    let h = Harness::new();
    let summary = h.fill_form().await;

    h.press(&h.seller, summary, CallbackAction::Restart).await;

    let (chat, message, text, keyboard) = h.gateway.last_edit();
    assert_eq!((chat, message), (SELLER_CHAT, summary));
    assert_eq!(text, views::WELCOME);
    assert_eq!(keyboard, Some(views::platform_keyboard()));
    assert_eq!(h.seller_state().await, Some(State::Platform));
}

#[tokio::test]
async fn moderation_outside_moderator_chat_is_ignored() {
    let h = Harness::new();
    let (id, _) = h.submit().await;
    let sent_before = h.gateway.outbound().len();

    // Forged approve from the seller's own chat
    h.press(&h.seller, MessageId(1), CallbackAction::Approve(id.clone()))
        .await;

    assert_eq!(h.gateway.outbound().len(), sent_before);
    assert!(h.store.get(&id).await.is_some());
}

#[tokio::test]
async fn unreachable_moderator_keeps_summary_confirmable() {
    let h = Harness::new();
    let summary = h.fill_form().await;
    h.gateway.block(Recipient::Id(MODERATOR_CHAT));

    let origin = MessageRef {
        chat: SELLER_CHAT,
        message: summary,
    };
    let res = handlers::handle_callback(
        &h.ctx,
        &h.seller,
        Harness::seller_identity(),
        origin,
        CallbackAction::Confirm,
    )
    .await;
    assert!(res.is_err());
    assert_eq!(h.store.len().await, 0);
    let (_, text, _) = h.gateway.last_sent_to(&Recipient::Id(SELLER_CHAT));
    assert_eq!(text, views::SUBMIT_FAILED);
    assert!(matches!(
        h.seller_state().await,
        Some(State::Confirmation { .. })
    ));

    h.gateway.unblock_all();
    h.press(&h.seller, summary, CallbackAction::Confirm).await;
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test]
async fn failed_channel_post_keeps_listing_pending() {
    let h = Harness::new();
    let (id, message) = h.submit().await;
    h.gateway
        .block(Recipient::ChannelUsername("@market".to_string()));

    h.press(&h.moderator, message, CallbackAction::Approve(id.clone()))
        .await;

    let (_, _, text, keyboard) = h.gateway.last_edit();
    assert_eq!(text, views::publish_failed(&id));
    assert_eq!(keyboard, Some(views::moderation_keyboard(&id)));
    assert!(h.store.get(&id).await.is_some());

    h.gateway.unblock_all();
    h.press(&h.moderator, message, CallbackAction::Approve(id.clone()))
        .await;
    assert_eq!(h.store.len().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_approvals_publish_once() {
    let h = Harness::new();
    let (id, message) = h.submit().await;

    tokio::join!(
        h.press(&h.moderator, message, CallbackAction::Approve(id.clone())),
        h.press(&h.moderator, message, CallbackAction::Approve(id.clone())),
    );

    let posts = h
        .gateway
        .texts_sent_to(&Recipient::ChannelUsername("@market".to_string()));
    assert_eq!(posts.len(), 1);
    let not_found = h
        .gateway
        .outbound()
        .into_iter()
        .filter(|o| matches!(o, Outbound::Edited { text, .. } if text == views::NOT_FOUND))
        .count();
    assert_eq!(not_found, 1);
    assert_eq!(h.store.len().await, 0);
}

#[tokio::test]
async fn seller_can_start_again_after_submitting() {
    let h = Harness::new();
    assert_eq!(h.seller_state().await, None, "storage starts empty");

    h.submit().await;
    handlers::start(&h.ctx, &h.seller, false)
        .await
        .expect("start after submission");

    let (_, text, keyboard) = h.gateway.last_sent_to(&Recipient::Id(SELLER_CHAT));
    assert_eq!(text, views::WELCOME);
    assert_eq!(keyboard, Some(views::platform_keyboard()));
    assert_eq!(h.seller_state().await, Some(State::Platform));
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test]
async fn stale_button_in_idle_chat_gets_generic_error() {
    let h = Harness::new();

    h.press(&h.seller, MessageId(42), CallbackAction::Platform(Platform::Telegram))
        .await;
    h.press(&h.seller, MessageId(42), CallbackAction::Confirm).await;

    let texts = h.gateway.texts_sent_to(&Recipient::Id(SELLER_CHAT));
    assert_eq!(texts, vec![views::GENERIC_ERROR, views::GENERIC_ERROR]);
    assert_eq!(h.seller_state().await, Some(State::Idle));
    assert_eq!(h.store.len().await, 0);
}

#[tokio::test]
async fn second_reject_returns_first_listing_to_review() {
    let h = Harness::new();
    let (first, first_message) = h.submit().await;
    let (second, second_message) = h.submit().await;

    h.press(&h.moderator, first_message, CallbackAction::Reject(first.clone()))
        .await;
    h.press(&h.moderator, second_message, CallbackAction::Reject(second.clone()))
        .await;
    h.type_text(&h.moderator, "duplicate").await;

    assert!(h.store.get(&first).await.is_some());
    assert!(h.store.get(&second).await.is_none());
    let restored = h.gateway.outbound().into_iter().any(|o| {
        matches!(o, Outbound::Edited { message, keyboard, .. }
            if message == first_message && keyboard == Some(views::moderation_keyboard(&first)))
    });
    assert!(restored, "first submission got its buttons back");

    // The restored buttons still work
    h.press(&h.moderator, first_message, CallbackAction::Approve(first.clone()))
        .await;
    assert_eq!(h.store.len().await, 0);
}

#[tokio::test]
async fn start_in_moderator_chat_keeps_rejection_reviewable() {
    let h = Harness::new();
    let (id, message) = h.submit().await;

    h.press(&h.moderator, message, CallbackAction::Reject(id.clone()))
        .await;
    handlers::start(&h.ctx, &h.moderator, false)
        .await
        .expect("moderator start");

    assert!(h.store.get(&id).await.is_some());
    assert!(!h.ctx.rejections.contains(MODERATOR_CHAT).await);
    let (chat, edited, text, keyboard) = h.gateway.last_edit();
    assert_eq!((chat, edited), (MODERATOR_CHAT, message));
    assert!(text.starts_with("📮 New Ad Submission:"));
    assert_eq!(keyboard, Some(views::moderation_keyboard(&id)));
    assert_eq!(
        h.moderator.get().await.expect("dialogue storage"),
        Some(State::Platform)
    );
}

#[tokio::test]
async fn reject_does_not_disturb_moderator_form() {
    let h = Harness::new();
    let (id, message) = h.submit().await;

    handlers::start(&h.ctx, &h.moderator, false)
        .await
        .expect("moderator start");
    let (welcome, _, _) = h.gateway.last_sent_to(&Recipient::Id(MODERATOR_CHAT));
    h.press(&h.moderator, welcome, CallbackAction::Platform(Platform::Twitter))
        .await;
    h.type_text(&h.moderator, "modhandle").await;

    h.press(&h.moderator, message, CallbackAction::Reject(id.clone()))
        .await;
    h.type_text(&h.moderator, "sold elsewhere").await;

    assert!(h.store.get(&id).await.is_none());
    assert_eq!(
        h.moderator.get().await.expect("dialogue storage"),
        Some(State::Followers {
            platform: Platform::Twitter,
            account_handle: "modhandle".to_string(),
        })
    );
}
