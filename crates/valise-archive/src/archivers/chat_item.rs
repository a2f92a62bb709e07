//! Chat item archiver: the dispatch point for every message and update kind.
//!
//! One outer `archive`/`restore` pair inspects the payload discriminant and
//! delegates to per-kind conversion helpers, exhaustively matched so a new
//! payload kind cannot be forgotten at any dispatch point.
//!
//! Edit-history chains travel inside the latest revision's frame: the frame
//! carries every past revision as a structurally complete item. On restore
//! the canonical order is decided by `date_sent_ms`, never by the order the
//! revisions arrive in, and only the newest revision becomes the live row
//! that reactions and expiry state attach to.

use valise_store::{
    ChatItemPayload, ChatItemRecord, ChatUpdate, Direction, EditState, GroupCallUpdate, Quote,
    SendStatus, StandardMessage, StoreWriter,
};

use crate::error::Result;
use crate::proto::{
    ChatItemFrame, ChatItemPayloadFrame, ChatUpdateFrame, DirectionFrame, GroupCallFrame,
    QuoteFrame, SendStatusFrame, StandardMessageFrame,
};
use crate::resolver::{ExportContext, ImportContext};

/// One logical item assembled from store rows: the latest revision plus its
/// past revisions (any enumeration order).
pub struct ChatItemChain {
    pub latest: ChatItemRecord,
    pub revisions: Vec<ChatItemRecord>,
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

pub fn archive(chain: &ChatItemChain, ctx: &mut ExportContext) -> ChatItemFrame {
    let mut revisions: Vec<&ChatItemRecord> = chain.revisions.iter().collect();
    revisions.sort_by_key(|r| r.date_sent_ms);

    let revision_frames = revisions
        .into_iter()
        // Nothing references a past revision, so it carries id 0.
        .map(|r| record_to_frame(r, 0, ctx))
        .collect();

    let id = ctx.chat_item_id(chain.latest.id);
    let mut frame = record_to_frame(&chain.latest, id, ctx);
    frame.revisions = revision_frames;
    frame
}

fn record_to_frame(record: &ChatItemRecord, id: u64, ctx: &mut ExportContext) -> ChatItemFrame {
    ChatItemFrame {
        id,
        chat_id: ctx.chat_id(record.chat_id),
        author_id: ctx.recipient_id(record.author_id),
        date_sent_ms: record.date_sent_ms,
        expire_start_ms: record.expire_start_ms,
        expire_duration_ms: record.expire_duration_ms,
        sms: record.sms,
        direction: direction_to_frame(&record.direction, ctx),
        revisions: Vec::new(),
        payload: payload_to_frame(&record.payload, ctx),
    }
}

fn direction_to_frame(direction: &Direction, ctx: &mut ExportContext) -> DirectionFrame {
    match direction {
        Direction::Incoming(detail) => DirectionFrame::Incoming(detail.clone()),
        Direction::Outgoing { send_status } => DirectionFrame::Outgoing {
            send_status: send_status
                .iter()
                .map(|s| SendStatusFrame {
                    recipient_id: ctx.recipient_id(s.recipient_id),
                    status: s.status,
                    timestamp_ms: s.timestamp_ms,
                })
                .collect(),
        },
        Direction::Directionless => DirectionFrame::Directionless,
    }
}

fn payload_to_frame(payload: &ChatItemPayload, ctx: &mut ExportContext) -> ChatItemPayloadFrame {
    match payload {
        ChatItemPayload::Standard(msg) => ChatItemPayloadFrame::Standard(StandardMessageFrame {
            text: msg.text.clone(),
            quote: msg.quote.as_ref().map(|q| QuoteFrame {
                author_id: ctx.recipient_id(q.author_id),
                target_sent_timestamp_ms: q.target_sent_timestamp_ms,
                text: q.text.clone(),
                kind: q.kind,
                attachments: q.attachments.clone(),
            }),
            attachments: msg.attachments.clone(),
            link_previews: msg.link_previews.clone(),
        }),
        ChatItemPayload::ContactShare(share) => ChatItemPayloadFrame::ContactShare(share.clone()),
        ChatItemPayload::Sticker(sticker) => ChatItemPayloadFrame::Sticker(sticker.clone()),
        ChatItemPayload::RemoteDeleted => ChatItemPayloadFrame::RemoteDeleted,
        ChatItemPayload::ViewOnce(view_once) => ChatItemPayloadFrame::ViewOnce(view_once.clone()),
        ChatItemPayload::GiftBadge(badge) => ChatItemPayloadFrame::GiftBadge(badge.clone()),
        ChatItemPayload::PaymentNotification(payment) => {
            ChatItemPayloadFrame::PaymentNotification(payment.clone())
        }
        ChatItemPayload::Update(update) => {
            ChatItemPayloadFrame::Update(update_to_frame(update, ctx))
        }
    }
}

fn update_to_frame(update: &ChatUpdate, ctx: &mut ExportContext) -> ChatUpdateFrame {
    match update {
        ChatUpdate::Simple(kind) => ChatUpdateFrame::Simple(*kind),
        ChatUpdate::ExpirationTimerChange(c) => ChatUpdateFrame::ExpirationTimerChange(c.clone()),
        ChatUpdate::ProfileNameChange(c) => ChatUpdateFrame::ProfileNameChange(c.clone()),
        ChatUpdate::ThreadMerge(m) => ChatUpdateFrame::ThreadMerge(m.clone()),
        ChatUpdate::SessionSwitchover(s) => ChatUpdateFrame::SessionSwitchover(s.clone()),
        ChatUpdate::LearnedProfileName(l) => ChatUpdateFrame::LearnedProfileName(l.clone()),
        ChatUpdate::GroupChange(events) => ChatUpdateFrame::GroupChange(events.clone()),
        ChatUpdate::IndividualCall(call) => ChatUpdateFrame::IndividualCall(call.clone()),
        ChatUpdate::GroupCall(call) => ChatUpdateFrame::GroupCall(GroupCallFrame {
            state: call.state,
            ringer_id: call.ringer_id.map(|id| ctx.recipient_id(id)),
            started_by_id: call.started_by_id.map(|id| ctx.recipient_id(id)),
            started_at_ms: call.started_at_ms,
            ended_at_ms: call.ended_at_ms,
            read: call.read,
        }),
    }
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

pub fn restore<W: StoreWriter>(
    frame: ChatItemFrame,
    ctx: &mut ImportContext,
    writer: &mut W,
) -> Result<()> {
    let archive_id = frame.id;

    // Flatten the outer frame and its past revisions into one candidate set,
    // then let the timestamps decide which revision is current. Archives may
    // carry revisions oldest-first or newest-first; neither order is trusted.
    let mut latest = frame_to_record(&frame, ctx)?;
    let mut past = frame
        .revisions
        .iter()
        .map(|r| frame_to_record(r, ctx))
        .collect::<Result<Vec<ChatItemRecord>>>()?;

    // Whichever revision carries the newest timestamp is the live one, even
    // if the archive nominated a different frame as outer.
    for record in &mut past {
        if record.date_sent_ms > latest.date_sent_ms {
            std::mem::swap(record, &mut latest);
        }
    }
    past.sort_by_key(|r| r.date_sent_ms);

    latest.edit_state = if past.is_empty() {
        EditState::None
    } else if is_read(&latest.direction) {
        EditState::LatestRevisionRead
    } else {
        EditState::LatestRevisionUnread
    };

    let latest_local_id = writer.insert_chat_item(&latest)?;
    ctx.register_chat_item(archive_id, latest_local_id);

    for mut record in past {
        record.edit_state = EditState::PastRevision;
        record.latest_revision_id = Some(latest_local_id);
        writer.insert_chat_item(&record)?;
    }
    Ok(())
}

fn is_read(direction: &Direction) -> bool {
    match direction {
        Direction::Incoming(detail) => detail.read,
        // Outgoing and directionless items have no unread state.
        Direction::Outgoing { .. } | Direction::Directionless => true,
    }
}

fn frame_to_record(frame: &ChatItemFrame, ctx: &ImportContext) -> Result<ChatItemRecord> {
    Ok(ChatItemRecord {
        id: 0,
        chat_id: ctx.resolve_chat(frame.chat_id)?,
        author_id: ctx.resolve_recipient(frame.author_id)?,
        date_sent_ms: frame.date_sent_ms,
        expire_start_ms: frame.expire_start_ms,
        expire_duration_ms: frame.expire_duration_ms,
        sms: frame.sms,
        direction: direction_from_frame(&frame.direction, ctx)?,
        edit_state: EditState::None,
        latest_revision_id: None,
        payload: payload_from_frame(&frame.payload, ctx)?,
    })
}

fn direction_from_frame(direction: &DirectionFrame, ctx: &ImportContext) -> Result<Direction> {
    Ok(match direction {
        DirectionFrame::Incoming(detail) => Direction::Incoming(detail.clone()),
        DirectionFrame::Outgoing { send_status } => Direction::Outgoing {
            send_status: send_status
                .iter()
                .map(|s| {
                    Ok(SendStatus {
                        recipient_id: ctx.resolve_recipient(s.recipient_id)?,
                        status: s.status,
                        timestamp_ms: s.timestamp_ms,
                    })
                })
                .collect::<Result<Vec<SendStatus>>>()?,
        },
        DirectionFrame::Directionless => Direction::Directionless,
    })
}

fn payload_from_frame(
    payload: &ChatItemPayloadFrame,
    ctx: &ImportContext,
) -> Result<ChatItemPayload> {
    Ok(match payload {
        ChatItemPayloadFrame::Standard(msg) => ChatItemPayload::Standard(StandardMessage {
            text: msg.text.clone(),
            quote: msg
                .quote
                .as_ref()
                .map(|q| -> Result<Quote> {
                    Ok(Quote {
                        author_id: ctx.resolve_recipient(q.author_id)?,
                        target_sent_timestamp_ms: q.target_sent_timestamp_ms,
                        text: q.text.clone(),
                        kind: q.kind,
                        attachments: q.attachments.clone(),
                    })
                })
                .transpose()?,
            attachments: msg.attachments.clone(),
            link_previews: msg.link_previews.clone(),
        }),
        ChatItemPayloadFrame::ContactShare(share) => ChatItemPayload::ContactShare(share.clone()),
        ChatItemPayloadFrame::Sticker(sticker) => ChatItemPayload::Sticker(sticker.clone()),
        ChatItemPayloadFrame::RemoteDeleted => ChatItemPayload::RemoteDeleted,
        ChatItemPayloadFrame::ViewOnce(view_once) => ChatItemPayload::ViewOnce(view_once.clone()),
        ChatItemPayloadFrame::GiftBadge(badge) => ChatItemPayload::GiftBadge(badge.clone()),
        ChatItemPayloadFrame::PaymentNotification(payment) => {
            ChatItemPayload::PaymentNotification(payment.clone())
        }
        ChatItemPayloadFrame::Update(update) => {
            ChatItemPayload::Update(update_from_frame(update, ctx)?)
        }
    })
}

fn update_from_frame(update: &ChatUpdateFrame, ctx: &ImportContext) -> Result<ChatUpdate> {
    Ok(match update {
        ChatUpdateFrame::Simple(kind) => ChatUpdate::Simple(*kind),
        ChatUpdateFrame::ExpirationTimerChange(c) => ChatUpdate::ExpirationTimerChange(c.clone()),
        ChatUpdateFrame::ProfileNameChange(c) => ChatUpdate::ProfileNameChange(c.clone()),
        ChatUpdateFrame::ThreadMerge(m) => ChatUpdate::ThreadMerge(m.clone()),
        ChatUpdateFrame::SessionSwitchover(s) => ChatUpdate::SessionSwitchover(s.clone()),
        ChatUpdateFrame::LearnedProfileName(l) => ChatUpdate::LearnedProfileName(l.clone()),
        ChatUpdateFrame::GroupChange(events) => ChatUpdate::GroupChange(events.clone()),
        ChatUpdateFrame::IndividualCall(call) => ChatUpdate::IndividualCall(call.clone()),
        ChatUpdateFrame::GroupCall(call) => ChatUpdate::GroupCall(GroupCallUpdate {
            state: call.state,
            ringer_id: call
                .ringer_id
                .map(|id| ctx.resolve_recipient(id))
                .transpose()?,
            started_by_id: call
                .started_by_id
                .map(|id| ctx.resolve_recipient(id))
                .transpose()?,
            started_at_ms: call.started_at_ms,
            ended_at_ms: call.ended_at_ms,
            read: call.read,
        }),
    })
}
