//! End-to-end: chat message in, voice frames (or a reply) out.

mod support;

use encore_commands::handlers::{MISSING_URL, NOT_IN_VOICE, PLAYBACK_FAILED};
use encore_commands::{build_dispatcher, CommandContext, CommandDispatcher, Reply, DEFAULT_PREFIX};
use encore_core::{ChannelId, UserId};
use support::{frames, Call, Fixture, Recorder, Resolution, GUILD, LISTENER, LURKER, V1};

fn dispatcher(fixture: Fixture) -> (CommandDispatcher, Recorder) {
    let (host, recorder) = fixture.build();
    (build_dispatcher(DEFAULT_PREFIX, host), recorder)
}

fn from(author: UserId) -> CommandContext {
    CommandContext {
        guild_id: Some(GUILD),
        channel_id: ChannelId::new(500),
        author_id: author,
        author_is_bot: false,
    }
}

async fn say(dispatcher: &CommandDispatcher, ctx: CommandContext, content: &str) -> Option<Reply> {
    dispatcher
        .handle_message(&ctx, content)
        .await
        .unwrap()
        .and_then(|response| response.reply)
}

#[tokio::test]
async fn play_streams_every_frame_to_the_callers_channel() {
    let (dispatcher, recorder) = dispatcher(Fixture {
        frames: frames(12),
        ..Default::default()
    });

    let reply = say(&dispatcher, from(LISTENER), "e.play https://valid.example/video").await;

    assert_eq!(reply, None);
    assert_eq!(recorder.calls().first(), Some(&Call::Connect(GUILD, V1)));
    assert_eq!(recorder.sent(), frames(12));
    assert_eq!(recorder.leaves(), 1);
}

#[tokio::test]
async fn play_without_url_asks_for_one() {
    let (dispatcher, recorder) = dispatcher(Fixture::default());

    let reply = say(&dispatcher, from(LISTENER), "e.play").await;

    assert_eq!(reply, Some(Reply::text(MISSING_URL)));
    assert_eq!(recorder.joins(), 0);
}

#[tokio::test]
async fn play_outside_voice_asks_caller_to_join() {
    let (dispatcher, recorder) = dispatcher(Fixture::default());

    let reply = say(&dispatcher, from(LURKER), "e.play https://valid.example/video").await;

    assert_eq!(reply, Some(Reply::text(NOT_IN_VOICE)));
    assert_eq!(recorder.joins(), 0);
}

#[tokio::test]
async fn no_matching_format_gives_generic_reply_and_leaves() {
    let (dispatcher, recorder) = dispatcher(Fixture {
        resolution: Resolution::NoMatchingFormat,
        ..Default::default()
    });

    let reply = say(&dispatcher, from(LISTENER), "e.play https://valid.example/video").await;

    assert_eq!(reply, Some(Reply::text(PLAYBACK_FAILED)));
    assert_eq!(recorder.joins(), 1);
    assert_eq!(recorder.leaves(), 1);
    assert!(recorder.sent().is_empty());
}

#[tokio::test]
async fn help_and_about_answer_with_embeds() {
    let (dispatcher, recorder) = dispatcher(Fixture::default());

    for command in ["e.help", "e.h", "e.about"] {
        let reply = say(&dispatcher, from(LISTENER), command).await;
        assert!(matches!(reply, Some(Reply::Embed(_))), "{command}");
    }
    assert!(recorder.calls().is_empty());
}

#[tokio::test]
async fn bots_and_ordinary_chat_are_ignored() {
    let (dispatcher, recorder) = dispatcher(Fixture::default());

    let bot = CommandContext {
        author_is_bot: true,
        ..from(LISTENER)
    };
    assert_eq!(say(&dispatcher, bot, "e.play https://valid.example/video").await, None);
    assert_eq!(say(&dispatcher, from(LISTENER), "good morning").await, None);
    assert_eq!(say(&dispatcher, from(LISTENER), "e.helpme").await, None);
    assert!(recorder.calls().is_empty());
}
