use aigw_protocol::claude::types::{ContentBlock, MessageContent, MessageParam};

/// Claude requires a body-level `max_tokens`; used when the source dialect
/// left its cap unset.
pub(crate) const DEFAULT_CLAUDE_MAX_TOKENS: u32 = 4096;

pub(crate) fn content_blocks(content: MessageContent) -> Vec<ContentBlock> {
    match content {
        MessageContent::Text(text) => vec![ContentBlock::Text { text }],
        MessageContent::Blocks(blocks) => blocks,
    }
}

/// Collapse a block list back to the compact string form when possible.
pub(crate) fn content_from_blocks(mut blocks: Vec<ContentBlock>) -> MessageContent {
    if blocks.len() == 1 && matches!(blocks[0], ContentBlock::Text { .. }) {
        if let Some(ContentBlock::Text { text }) = blocks.pop() {
            return MessageContent::Text(text);
        }
    }
    MessageContent::Blocks(blocks)
}

/// Merge consecutive same-role messages into one message with concatenated
/// content blocks, then trim trailing whitespace from the final assistant
/// text block. The Claude dialect penalizes consecutive same-role turns and
/// rejects trailing whitespace on a prefilled assistant turn.
pub(crate) fn merge_adjacent_roles(messages: Vec<MessageParam>) -> Vec<MessageParam> {
    let mut merged: Vec<(aigw_protocol::claude::types::MessageRole, Vec<ContentBlock>)> =
        Vec::new();

    for message in messages {
        let blocks = content_blocks(message.content);
        match merged.last_mut() {
            Some((role, existing)) if *role == message.role => existing.extend(blocks),
            _ => merged.push((message.role, blocks)),
        }
    }

    let mut messages: Vec<MessageParam> = merged
        .into_iter()
        .map(|(role, blocks)| MessageParam {
            role,
            content: content_from_blocks(blocks),
        })
        .collect();

    trim_trailing_assistant_whitespace(&mut messages);
    messages
}

fn trim_trailing_assistant_whitespace(messages: &mut [MessageParam]) {
    let Some(last) = messages.last_mut() else {
        return;
    };
    if last.role != aigw_protocol::claude::types::MessageRole::Assistant {
        return;
    }
    match &mut last.content {
        MessageContent::Text(text) => {
            let trimmed = text.trim_end().to_string();
            *text = trimmed;
        }
        MessageContent::Blocks(blocks) => {
            if let Some(ContentBlock::Text { text }) = blocks.last_mut() {
                let trimmed = text.trim_end().to_string();
                *text = trimmed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigw_protocol::claude::types::MessageRole;

    fn user_text(text: &str) -> MessageParam {
        MessageParam {
            role: MessageRole::User,
            content: MessageContent::Text(text.to_string()),
        }
    }

    fn assistant_text(text: &str) -> MessageParam {
        MessageParam {
            role: MessageRole::Assistant,
            content: MessageContent::Text(text.to_string()),
        }
    }

    #[test]
    fn consecutive_same_role_messages_collapse() {
        let merged = merge_adjacent_roles(vec![
            user_text("a"),
            user_text("b"),
            assistant_text("c"),
        ]);
        assert_eq!(merged.len(), 2);
        match &merged[0].content {
            MessageContent::Blocks(blocks) => assert_eq!(blocks.len(), 2),
            other => panic!("expected merged blocks, got {other:?}"),
        }
    }

    #[test]
    fn trailing_assistant_whitespace_is_trimmed() {
        let merged = merge_adjacent_roles(vec![user_text("q"), assistant_text("answer  \n")]);
        assert_eq!(
            merged[1].content,
            MessageContent::Text("answer".to_string())
        );
    }

    #[test]
    fn trailing_user_whitespace_is_kept() {
        let merged = merge_adjacent_roles(vec![user_text("question  ")]);
        assert_eq!(
            merged[0].content,
            MessageContent::Text("question  ".to_string())
        );
    }
}
