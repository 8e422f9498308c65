//! The reference listener set.

use anyhow::Context;
use relay::prelude::*;
use serde_json::{Value, json};
use tracing::info;

/// Channel new team members are welcomed in.
pub const WELCOME_CHANNEL: &str = "C12345";

/// Unix time for September 30, 2019 11:59:59 PM.
pub const WHEN_SEPTEMBER_ENDS: i64 = 1569887999;

/// Registers every listener, in the order they fire.
pub fn register(registry: &mut Registry) {
    // messages
    registry.on_message(Matcher::Any, wave).named("wave");
    registry.on_message("knock knock", knock_knock);
    registry.on_message(Matcher::subtype("bot_message"), bot_message);
    registry.on_message("wake me up", wake_me_up);

    // events
    registry
        .register(
            Category::Reaction,
            Matcher::fields([
                ("type", "reaction_added"),
                ("reaction", "calendar"),
                ("item.type", "message"),
            ]),
            calendar_reaction,
        )
        .named("calendar_reaction");
    registry.on_event_type("team_join", welcome).named("welcome");

    // actions
    registry
        .on_action_id("approve_button", acknowledge_approval)
        .named("approve_ack");
    registry
        .on_action(
            Matcher::fields([("action_id", "select_user"), ("block_id", "assign_ticket")]),
            assign_ticket,
        )
        .named("assign_ticket");
    registry
        .on_action_id("approve_button", approve)
        .named("approve_reply");
}

/// Both forms a wave arrives in: the emoji itself and its shortcode.
const WAVE: [&str; 2] = ["👋", ":wave:"];

/// Greets whoever waves, ignoring edits, bot posts and other subtypes.
async fn wave(ctx: HandlerContext, envelope: Arc<EventEnvelope>) -> HandlerResult {
    let waved = envelope
        .text()
        .is_some_and(|text| WAVE.iter().any(|form| text.contains(form)));
    if !waved || envelope.subtype().is_some() {
        return Ok(());
    }
    let user = envelope.user().unwrap_or("there");
    ctx.reply(&format!("👋  Hello, <@{user}>")).await?;
    Ok(())
}

async fn knock_knock(ctx: HandlerContext, _envelope: Arc<EventEnvelope>) -> HandlerResult {
    ctx.reply("_Who's there?_ Me").await?;
    Ok(())
}

async fn bot_message(_ctx: HandlerContext, envelope: Arc<EventEnvelope>) -> HandlerResult {
    info!(
        "The bot user {} said {}",
        envelope.user().unwrap_or("<unknown>"),
        envelope.text().unwrap_or_default()
    );
    Ok(())
}

async fn wake_me_up(ctx: HandlerContext, envelope: Arc<EventEnvelope>) -> HandlerResult {
    let channel = envelope.reply_channel().context("message has no channel")?;
    ctx.client()
        .schedule_message(channel, WHEN_SEPTEMBER_ENDS, "Summer has come and passed")
        .await?;
    Ok(())
}

/// Offers a date picker when someone reacts to a message with 📅.
async fn calendar_reaction(ctx: HandlerContext, _envelope: Arc<EventEnvelope>) -> HandlerResult {
    ctx.reply_with_blocks("Pick a reminder date", Some(date_picker_blocks()))
        .await?;
    Ok(())
}

fn date_picker_blocks() -> Value {
    json!([{
        "type": "section",
        "text": {
            "type": "mrkdwn",
            "text": "Pick a date for me to remind you"
        },
        "accessory": {
            "type": "datepicker",
            "action_id": "datepicker_remind",
            "initial_date": "2019-04-28",
            "placeholder": {
                "type": "plain_text",
                "text": "Select a date"
            }
        }
    }])
}

async fn welcome(ctx: HandlerContext, envelope: Arc<EventEnvelope>) -> HandlerResult {
    let user = envelope.user().context("team_join without user")?;
    let text = format!("Welcome to the team, <@{user}>! 🎉 You can introduce yourself in this channel.");
    let handle = ctx.client().post_message(WELCOME_CHANNEL, &text, None).await?;
    info!(channel = %handle.channel, ts = %handle.ts, "Welcome message posted");
    Ok(())
}

async fn acknowledge_approval(ctx: HandlerContext, _envelope: Arc<EventEnvelope>) -> HandlerResult {
    ctx.acknowledge()?;
    Ok(())
}

/// Marks the message an assignee was picked on, unless it lives in a view.
async fn assign_ticket(ctx: HandlerContext, envelope: Arc<EventEnvelope>) -> HandlerResult {
    ctx.acknowledge()?;
    if let (Some(channel), Some(ts)) = (envelope.reply_channel(), envelope.message_ts()) {
        ctx.client()
            .add_reaction(channel, ts, "white_check_mark")
            .await?;
    }
    Ok(())
}

async fn approve(ctx: HandlerContext, _envelope: Arc<EventEnvelope>) -> HandlerResult {
    ctx.acknowledge()?;
    ctx.reply("Request approved 👍").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay::framework::Dispatcher;
    use parking_lot::Mutex;

    /// Records `method:channel:text` for every call.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn push(&self, call: String) {
            self.calls.lock().push(call);
        }
    }

    #[async_trait]
    impl RemoteClient for Recorder {
        async fn post_message(
            &self,
            channel: &str,
            text: &str,
            _blocks: Option<Value>,
        ) -> RemoteResult<MessageHandle> {
            self.push(format!("post:{channel}:{text}"));
            Ok(MessageHandle {
                channel: channel.to_string(),
                ts: "1.0".to_string(),
            })
        }

        async fn schedule_message(
            &self,
            channel: &str,
            post_at: i64,
            text: &str,
        ) -> RemoteResult<ScheduleHandle> {
            self.push(format!("schedule:{channel}:{post_at}:{text}"));
            Ok(ScheduleHandle {
                channel: channel.to_string(),
                scheduled_message_id: "Q1".to_string(),
                post_at,
            })
        }

        async fn add_reaction(&self, channel: &str, ts: &str, name: &str) -> RemoteResult<()> {
            self.push(format!("react:{channel}:{ts}:{name}"));
            Ok(())
        }

        async fn acknowledge(&self, _envelope: &EventEnvelope) -> RemoteResult<()> {
            self.push("ack".to_string());
            Ok(())
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<Recorder>) {
        let mut registry = Registry::new();
        register(&mut registry);
        let client = Arc::new(Recorder::default());
        (Dispatcher::new(registry, client.clone()), client)
    }

    async fn dispatch(dispatcher: &Dispatcher, payload: Value) {
        let report = dispatcher.dispatch_raw(RawEvent::untagged(payload)).await;
        assert!(report.is_clean(), "{report:?}");
    }

    #[tokio::test]
    async fn test_wave_ignores_subtypes() {
        let (dispatcher, client) = dispatcher();
        dispatch(
            &dispatcher,
            json!({ "type": "message", "channel": "C1", "user": "U1", "text": "👋" }),
        )
        .await;
        dispatch(
            &dispatcher,
            json!({ "type": "message", "subtype": "message_changed", "channel": "C1", "text": "👋" }),
        )
        .await;

        assert_eq!(client.calls(), ["post:C1:👋  Hello, <@U1>"]);
    }

    #[tokio::test]
    async fn test_wave_shortcode_replies_once() {
        let (dispatcher, client) = dispatcher();
        dispatch(
            &dispatcher,
            json!({ "type": "message", "channel": "C1", "user": "U2", "text": "morning :wave:" }),
        )
        .await;
        dispatch(
            &dispatcher,
            json!({ "type": "message", "channel": "C1", "user": "U3", "text": ":wave: 👋" }),
        )
        .await;
        dispatch(
            &dispatcher,
            json!({ "type": "message", "channel": "C1", "user": "U4", "text": "no greeting here" }),
        )
        .await;

        assert_eq!(
            client.calls(),
            ["post:C1:👋  Hello, <@U2>", "post:C1:👋  Hello, <@U3>"]
        );
    }

    #[tokio::test]
    async fn test_calendar_reaction_only_on_messages() {
        let (dispatcher, client) = dispatcher();
        dispatch(
            &dispatcher,
            json!({
                "type": "reaction_added",
                "reaction": "calendar",
                "item": { "type": "file", "file": "F1" }
            }),
        )
        .await;
        dispatch(
            &dispatcher,
            json!({
                "type": "reaction_added",
                "reaction": "calendar",
                "item": { "type": "message", "channel": "C7", "ts": "17.1" }
            }),
        )
        .await;

        assert_eq!(client.calls(), ["post:C7:Pick a reminder date"]);
    }

    #[tokio::test]
    async fn test_team_join_and_wake_me_up() {
        let (dispatcher, client) = dispatcher();
        dispatch(&dispatcher, json!({ "type": "team_join", "user": { "id": "U9" } })).await;
        dispatch(
            &dispatcher,
            json!({ "type": "message", "channel": "C2", "user": "U1", "text": "please wake me up" }),
        )
        .await;

        assert_eq!(
            client.calls(),
            [
                "post:C12345:Welcome to the team, <@U9>! 🎉 You can introduce yourself in this channel.",
                "schedule:C2:1569887999:Summer has come and passed",
            ]
        );
    }

    #[tokio::test]
    async fn test_approve_button_fires_both_listeners() {
        let (dispatcher, client) = dispatcher();
        dispatch(
            &dispatcher,
            json!({
                "type": "block_actions",
                "channel": { "id": "C3" },
                "actions": [{ "action_id": "approve_button", "block_id": "b1" }]
            }),
        )
        .await;

        let calls = client.calls();
        assert_eq!(calls.iter().filter(|c| *c == "ack").count(), 2);
        assert!(calls.contains(&"post:C3:Request approved 👍".to_string()));
    }

    #[tokio::test]
    async fn test_assign_ticket_reacts_on_message() {
        let (dispatcher, client) = dispatcher();
        dispatch(
            &dispatcher,
            json!({
                "type": "block_actions",
                "channel": { "id": "C4" },
                "message": { "ts": "42.0" },
                "actions": [{ "action_id": "select_user", "block_id": "assign_ticket" }]
            }),
        )
        .await;

        let mut calls = client.calls();
        calls.sort();
        assert_eq!(calls, ["ack", "react:C4:42.0:white_check_mark"]);
    }
}
