//! Telegram handlers for the post-preparation workflow.
//!
//! Each handler locks the sender's session for its whole run, including
//! file downloads and sends, so one user's events are processed strictly
//! in arrival order while other users proceed independently.

use crate::caption::CaptionTemplate;
use crate::session::{FinishStep, Session, TextOutcome, UserId};
use crate::storage::TempStore;
use crate::store::SessionStore;
use crate::utils::escape_markdown_v2;
use anyhow::Result;
use std::sync::Arc;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

/// Commands registered with Telegram at startup.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "Start a new post session.")]
    Start,
    #[command(description = "Set a DOC prefix (example: SOT -).")]
    SetPrefix,
    #[command(description = "Upload a custom thumbnail.")]
    SetThumbnail,
    #[command(description = "Send all final PDFs in order.")]
    Finish,
    #[command(description = "Liveness probe.")]
    Healthcheck,
}

const WELCOME: &str = "🔰 *Welcome\\!*\n\n\
    Send me the post title to begin\\.\n\n\
    👉 *Commands:*\n\
    /setprefix — set a DOC prefix \\(example: SOT \\-\\)\n\
    /setthumbnail — upload a custom thumbnail\n\
    /finish — send all final PDFs in order";

const NO_PDFS: &str = "❗ No PDFs found. Upload first.";

/// User id for a message, `0` when the sender is hidden.
#[must_use]
pub fn get_user_id_safe(msg: &Message) -> UserId {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// /start: begin a fresh session, discarding any previous one.
pub async fn start(
    bot: Bot,
    msg: Message,
    store: Arc<SessionStore>,
    temp: Arc<TempStore>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    store.reset(user_id).await;
    // The abandoned session may have materialized files already.
    if let Err(e) = temp.purge(user_id).await {
        warn!("Failed to purge temp files for user {}: {}", user_id, e);
    }
    info!("Started a fresh session for user {}", user_id);

    bot.send_message(msg.chat.id, WELCOME)
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
    Ok(())
}

/// /setprefix: the next text message becomes the document prefix.
pub async fn set_prefix(bot: Bot, msg: Message, store: Arc<SessionStore>) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let session = store.obtain(user_id).await;
    session.lock().await.expect_prefix();

    bot.send_message(
        msg.chat.id,
        "✏️ Send me your desired DOC prefix now.\nExample: SOT -",
    )
    .await?;
    Ok(())
}

/// /setthumbnail: prompt for a photo; the photo handler does the rest.
pub async fn set_thumbnail(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(
        msg.chat.id,
        "📷 Send me a photo now to set as your custom thumbnail.",
    )
    .await?;
    Ok(())
}

/// /healthcheck: liveness probe.
pub async fn healthcheck(bot: Bot, msg: Message, store: Arc<SessionStore>) -> Result<()> {
    let active = store.active_count().await;
    bot.send_message(msg.chat.id, format!("OK ({active} active sessions)"))
        .await?;
    Ok(())
}

/// Photo upload: store the largest size as the session thumbnail.
pub async fn handle_photo(bot: Bot, msg: Message, store: Arc<SessionStore>) -> Result<()> {
    let Some(photo) = msg.photo().and_then(<[_]>::last) else {
        return Ok(());
    };
    let user_id = get_user_id_safe(&msg);
    let session = store.obtain(user_id).await;
    session.lock().await.set_thumbnail(photo.file.id.clone());
    info!("Thumbnail updated for user {}", user_id);

    bot.send_message(msg.chat.id, "✅ Thumbnail saved!").await?;
    Ok(())
}

/// Document upload: register it for later renaming, or guide the user if
/// the title/body are still missing.
pub async fn handle_document(bot: Bot, msg: Message, store: Arc<SessionStore>) -> Result<()> {
    let Some(doc) = msg.document() else {
        return Ok(());
    };
    let user_id = get_user_id_safe(&msg);
    let session = store.obtain(user_id).await;
    let accepted = session
        .lock()
        .await
        .accept_document(doc.file.id.clone(), msg.id);

    if let Err(e) = accepted {
        info!("Rejected upload from user {}: {}", user_id, e);
        bot.send_message(
            msg.chat.id,
            "❗ Send the post title and body first. Use /start to begin.",
        )
        .await?;
        return Ok(());
    }

    info!("Registered upload {} from user {}", msg.id.0, user_id);
    bot.send_message(msg.chat.id, "✏️ Write the file name in reply to this document.")
        .await?;
    Ok(())
}

/// Plain text: prefix capture first, then rename replies, then the
/// title → body progression.
pub async fn handle_text(
    bot: Bot,
    msg: Message,
    store: Arc<SessionStore>,
    temp: Arc<TempStore>,
) -> Result<()> {
    let text = msg.text().unwrap_or_default().trim().to_string();
    if text.is_empty() {
        return Ok(());
    }

    let user_id = get_user_id_safe(&msg);
    let session_arc = store.obtain(user_id).await;
    let mut session = session_arc.lock().await;

    // Rename replies win over title/body progression, but never over a
    // pending prefix capture.
    if !session.awaiting_prefix() {
        if let Some(reply) = msg.reply_to_message() {
            if reply.document().is_some() {
                return finalize_rename(&bot, &msg, &mut session, &temp, &text, reply.id).await;
            }
        }
    }

    match session.apply_text(&text) {
        TextOutcome::PrefixSet(prefix) => {
            bot.send_message(
                msg.chat.id,
                format!("✅ DOC prefix set to: `{}`", escape_markdown_v2(&prefix)),
            )
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        }
        TextOutcome::TitleSet => {
            bot.send_message(msg.chat.id, "✏️ Write the body:").await?;
        }
        TextOutcome::BodySet => {
            bot.send_message(
                msg.chat.id,
                "📎 Great! Now upload PDF(s).\nReply each with file name. Use /finish when done.",
            )
            .await?;
        }
        TextOutcome::Ready => {
            bot.send_message(msg.chat.id, "✅ Ready. Upload PDFs or use /finish.")
                .await?;
        }
    }
    Ok(())
}

/// Materialize and resend one attachment under its new name, then mark it
/// finalized.
async fn finalize_rename(
    bot: &Bot,
    msg: &Message,
    session: &mut Session,
    temp: &TempStore,
    base: &str,
    reply_id: MessageId,
) -> Result<()> {
    // A reply that matches no pending upload is deliberately ignored: the
    // upload may already be finalized, or the reply targets a document the
    // session never tracked.
    let Some(index) = session.find_pending(reply_id) else {
        return Ok(());
    };

    let user_id = get_user_id_safe(msg);
    let display_name = session.display_name_for(base);
    let dir = temp.prepare(user_id).await?;
    let path = dir.join(&display_name);

    let file_id = session.attachments()[index].file_id.clone();
    let file = bot.get_file(file_id).await?;
    let mut dst = tokio::fs::File::create(&path).await?;
    bot.download_file(&file.path, &mut dst).await?;

    let mut request = bot.send_document(
        msg.chat.id,
        InputFile::file(path.clone()).file_name(display_name.clone()),
    );
    if let Some(thumb) = session.thumbnail() {
        request = request.thumbnail(InputFile::file_id(thumb.clone()));
    }
    request.await?;

    session.finalize_attachment(index, path, display_name.clone());
    info!(
        "Finalized upload {} for user {} as {}",
        reply_id.0, user_id, display_name
    );

    bot.send_message(
        msg.chat.id,
        format!("✅ Renamed & uploaded: `{}`", escape_markdown_v2(&display_name)),
    )
    .parse_mode(ParseMode::MarkdownV2)
    .await?;
    Ok(())
}

/// /finish: deliver every finalized attachment in upload order with the
/// caption on the last slot, then destroy the session.
pub async fn finish(
    bot: Bot,
    msg: Message,
    store: Arc<SessionStore>,
    temp: Arc<TempStore>,
    template: Arc<CaptionTemplate>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let Some(session_arc) = store.get(user_id).await else {
        bot.send_message(msg.chat.id, NO_PDFS).await?;
        return Ok(());
    };

    let session = session_arc.lock().await;
    let plan = match session.finish_plan() {
        Ok(plan) => plan,
        Err(e) => {
            info!("Finish rejected for user {}: {}", user_id, e);
            drop(session);
            bot.send_message(msg.chat.id, NO_PDFS).await?;
            return Ok(());
        }
    };

    let caption = template.compose(&plan.title, &plan.body);
    for step in &plan.steps {
        deliver_step(&bot, &msg, &session, step, &caption).await?;
    }
    drop(session);

    // The session is gone whatever the per-item outcomes were; the user was
    // already warned about anything skipped.
    if let Err(e) = temp.purge(user_id).await {
        warn!("Failed to remove temp files for user {}: {}", user_id, e);
    }
    store.remove(user_id).await;
    info!("Session finished and cleared for user {}", user_id);

    bot.send_message(msg.chat.id, "✅ All files sent in order. Session cleared!")
        .await?;
    Ok(())
}

async fn deliver_step(
    bot: &Bot,
    msg: &Message,
    session: &Session,
    step: &FinishStep,
    caption: &str,
) -> Result<()> {
    match step {
        FinishStep::Warn { upload_msg_id } => {
            bot.send_message(
                msg.chat.id,
                format!(
                    "⚠️ Not finalized: Please reply with file name for PDF uploaded in message ID {}",
                    upload_msg_id.0
                ),
            )
            .await?;
        }
        FinishStep::Deliver {
            path,
            display_name,
            with_caption,
        } => {
            let mut request = bot.send_document(
                msg.chat.id,
                InputFile::file(path.clone()).file_name(display_name.clone()),
            );
            if let Some(thumb) = session.thumbnail() {
                request = request.thumbnail(InputFile::file_id(thumb.clone()));
            }
            if *with_caption {
                request = request
                    .caption(caption.to_string())
                    .parse_mode(ParseMode::MarkdownV2);
            }
            request.await?;
        }
    }
    Ok(())
}
