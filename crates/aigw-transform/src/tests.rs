use serde_json::json;

use aigw_protocol::claude::messages::MessagesRequest;
use aigw_protocol::claude::stream::{
    ContentBlockDelta, StreamEvent as ClaudeStreamEvent, StreamEventKnown, StreamMessageDelta,
    StreamMessageStart,
};
use aigw_protocol::claude::types::{
    ContentBlock as ClaudeBlock, MessageContent, MessageParam, MessageRole, StopReason,
    SystemParam, ToolResultContent, Usage as ClaudeUsage,
};
use aigw_protocol::gemini::generate_content::{Candidate, GenerateContentResponse};
use aigw_protocol::gemini::types::{
    Content, ContentRole, FinishReason as GeminiFinishReason, FunctionCall as GeminiFunctionCall,
    Part,
};
use aigw_protocol::openai::chat_completions::request::ChatCompletionRequest;
use aigw_protocol::openai::chat_completions::stream::{
    ChatCompletionChunk, ChatCompletionChunkObjectType, StreamChoice, StreamDelta,
};
use aigw_protocol::openai::chat_completions::types::{
    FinishReason, FunctionCall, KnownFinishReason, RequestMessage, TextContent, ToolCall,
    ToolCallType, UserContent,
};
use aigw_protocol::openai::models::{
    ListObjectType, Model, ModelListResponse as OpenAIModelListResponse, ModelObjectType,
};

use crate::dispatch::{
    GenerateRequest, ModelList, Proto, StreamChunk, StreamTransformer, TransformError,
    convert_model_list, convert_request,
};

fn claude_request(messages: Vec<MessageParam>) -> MessagesRequest {
    MessagesRequest {
        model: "claude-sonnet-4-5".to_string(),
        max_tokens: 1024,
        messages,
        system: None,
        metadata: None,
        stop_sequences: None,
        stream: None,
        temperature: None,
        thinking: None,
        tool_choice: None,
        tools: None,
        top_k: None,
        top_p: None,
    }
}

fn openai_request(messages: Vec<RequestMessage>) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: "gpt-test".to_string(),
        messages,
        max_tokens: None,
        max_completion_tokens: None,
        temperature: None,
        top_p: None,
        stop: None,
        stream: None,
        tools: None,
        tool_choice: None,
        parallel_tool_calls: None,
        reasoning_effort: None,
        user: None,
    }
}

fn openai_chunk(delta: StreamDelta, finish_reason: Option<FinishReason>) -> ChatCompletionChunk {
    ChatCompletionChunk {
        id: "chatcmpl-1".to_string(),
        object: ChatCompletionChunkObjectType::ChatCompletionChunk,
        created: 1,
        model: "gpt-test".to_string(),
        choices: vec![StreamChoice {
            index: 0,
            delta,
            finish_reason,
        }],
        usage: None,
    }
}

#[test]
fn unsupported_pairs_fail_loudly() {
    let request = GenerateRequest::OpenAIResponse(
        aigw_protocol::openai::responses::request::ResponseRequest {
            model: "gpt-test".to_string(),
            input: aigw_protocol::openai::responses::request::InputParam::Text("hi".to_string()),
            instructions: None,
            max_output_tokens: None,
            temperature: None,
            top_p: None,
            stream: None,
            tools: None,
            tool_choice: None,
            parallel_tool_calls: None,
            reasoning: None,
            store: None,
        },
    );
    let err = convert_request(request, Proto::Claude).unwrap_err();
    assert_eq!(
        err,
        TransformError::UnsupportedTarget {
            src: Proto::OpenAIResponse,
            dst: Proto::Claude,
        }
    );

    assert!(StreamTransformer::new(Proto::Claude, Proto::OpenAIResponse, "m").is_err());
}

#[test]
fn openai_to_claude_round_trip_preserves_conversation() {
    let source = openai_request(vec![
        RequestMessage::System {
            content: TextContent::Text("be brief".to_string()),
            name: None,
        },
        RequestMessage::User {
            content: UserContent::Text("what's the weather?".to_string()),
            name: None,
        },
        RequestMessage::Assistant {
            content: None,
            reasoning_content: None,
            tool_calls: Some(vec![ToolCall {
                id: "call_1".to_string(),
                r#type: ToolCallType::Function,
                function: FunctionCall {
                    name: "get_weather".to_string(),
                    arguments: "{\"city\":\"Oslo\"}".to_string(),
                },
            }]),
            name: None,
        },
        RequestMessage::Tool {
            content: TextContent::Text("12C, rain".to_string()),
            tool_call_id: "call_1".to_string(),
        },
    ]);

    let claude = match convert_request(GenerateRequest::OpenAIChat(source), Proto::Claude).unwrap()
    {
        GenerateRequest::Claude(request) => request,
        other => panic!("unexpected output: {other:?}"),
    };
    assert_eq!(claude.system, Some(SystemParam::Text("be brief".to_string())));
    assert_eq!(claude.messages.len(), 3);

    let back = match convert_request(GenerateRequest::Claude(claude), Proto::OpenAIChat).unwrap() {
        GenerateRequest::OpenAIChat(request) => request,
        other => panic!("unexpected output: {other:?}"),
    };

    // system + user + assistant(tool_calls) + tool
    assert_eq!(back.messages.len(), 4);
    match &back.messages[2] {
        RequestMessage::Assistant {
            tool_calls: Some(tool_calls),
            ..
        } => {
            assert_eq!(tool_calls.len(), 1);
            assert_eq!(tool_calls[0].id, "call_1");
            assert_eq!(tool_calls[0].function.name, "get_weather");
            let args: serde_json::Value =
                serde_json::from_str(&tool_calls[0].function.arguments).unwrap();
            assert_eq!(args, json!({"city": "Oslo"}));
        }
        other => panic!("expected assistant tool call, got {other:?}"),
    }
    match &back.messages[3] {
        RequestMessage::Tool { tool_call_id, .. } => assert_eq!(tool_call_id, "call_1"),
        other => panic!("expected tool message, got {other:?}"),
    }
}

#[test]
fn dangling_tool_calls_are_dropped_toward_openai() {
    let source = claude_request(vec![
        MessageParam {
            role: MessageRole::User,
            content: MessageContent::Text("run it".to_string()),
        },
        MessageParam {
            role: MessageRole::Assistant,
            content: MessageContent::Blocks(vec![ClaudeBlock::ToolUse {
                id: "toolu_nores".to_string(),
                name: "run".to_string(),
                input: json!({}),
            }]),
        },
    ]);

    let openai = match convert_request(GenerateRequest::Claude(source), Proto::OpenAIChat).unwrap()
    {
        GenerateRequest::OpenAIChat(request) => request,
        other => panic!("unexpected output: {other:?}"),
    };
    // user only: the assistant message reduces to nothing once its unpaired
    // tool call is dropped.
    assert_eq!(openai.messages.len(), 1);
    assert!(matches!(openai.messages[0], RequestMessage::User { .. }));
}

#[test]
fn paired_tool_calls_survive_toward_openai() {
    let source = claude_request(vec![
        MessageParam {
            role: MessageRole::Assistant,
            content: MessageContent::Blocks(vec![ClaudeBlock::ToolUse {
                id: "toolu_1".to_string(),
                name: "run".to_string(),
                input: json!({"arg": 1}),
            }]),
        },
        MessageParam {
            role: MessageRole::User,
            content: MessageContent::Blocks(vec![ClaudeBlock::ToolResult {
                tool_use_id: "toolu_1".to_string(),
                content: Some(ToolResultContent::Text("done".to_string())),
                is_error: None,
            }]),
        },
    ]);

    let openai = match convert_request(GenerateRequest::Claude(source), Proto::OpenAIChat).unwrap()
    {
        GenerateRequest::OpenAIChat(request) => request,
        other => panic!("unexpected output: {other:?}"),
    };
    assert_eq!(openai.messages.len(), 2);
    assert!(matches!(
        &openai.messages[0],
        RequestMessage::Assistant {
            tool_calls: Some(calls),
            ..
        } if calls.len() == 1
    ));
}

#[test]
fn consecutive_roles_merge_toward_claude() {
    let source = openai_request(vec![
        RequestMessage::User {
            content: UserContent::Text("first".to_string()),
            name: None,
        },
        RequestMessage::User {
            content: UserContent::Text("second".to_string()),
            name: None,
        },
        RequestMessage::Assistant {
            content: Some(TextContent::Text("reply   ".to_string())),
            reasoning_content: None,
            tool_calls: None,
            name: None,
        },
    ]);

    let claude = match convert_request(GenerateRequest::OpenAIChat(source), Proto::Claude).unwrap()
    {
        GenerateRequest::Claude(request) => request,
        other => panic!("unexpected output: {other:?}"),
    };
    assert_eq!(claude.messages.len(), 2);
    match &claude.messages[0].content {
        MessageContent::Blocks(blocks) => assert_eq!(blocks.len(), 2),
        other => panic!("expected merged blocks, got {other:?}"),
    }
    // Trailing whitespace on the final assistant turn is trimmed.
    assert_eq!(
        claude.messages[1].content,
        MessageContent::Text("reply".to_string())
    );
}

#[test]
fn system_instruction_lands_in_gemini_field() {
    let mut source = claude_request(vec![MessageParam {
        role: MessageRole::User,
        content: MessageContent::Text("hello".to_string()),
    }]);
    source.system = Some(SystemParam::Text("be factual".to_string()));

    let gemini = match convert_request(GenerateRequest::Claude(source), Proto::Gemini).unwrap() {
        GenerateRequest::Gemini(request) => request,
        other => panic!("unexpected output: {other:?}"),
    };
    let instruction = gemini.body.system_instruction.expect("system instruction");
    assert_eq!(instruction.into_text(), "be factual");
    assert_eq!(gemini.body.contents.len(), 1);
}

#[test]
fn claude_stream_to_openai_reconstructs_text_and_finish() {
    // The canonical scenario: "Hi" + " there" ending with end_turn.
    let events = vec![
        ClaudeStreamEvent::Known(StreamEventKnown::MessageStart {
            message: StreamMessageStart {
                id: "msg_1".to_string(),
                model: "claude-sonnet-4-5".to_string(),
                role: MessageRole::Assistant,
                content: Vec::new(),
                usage: ClaudeUsage::default(),
                stop_reason: None,
            },
        }),
        ClaudeStreamEvent::Known(StreamEventKnown::ContentBlockStart {
            index: 0,
            content_block: ClaudeBlock::Text {
                text: String::new(),
            },
        }),
        ClaudeStreamEvent::Known(StreamEventKnown::ContentBlockDelta {
            index: 0,
            delta: ContentBlockDelta::TextDelta {
                text: "Hi".to_string(),
            },
        }),
        ClaudeStreamEvent::Known(StreamEventKnown::ContentBlockDelta {
            index: 0,
            delta: ContentBlockDelta::TextDelta {
                text: " there".to_string(),
            },
        }),
        ClaudeStreamEvent::Known(StreamEventKnown::ContentBlockStop { index: 0 }),
        ClaudeStreamEvent::Known(StreamEventKnown::MessageDelta {
            delta: StreamMessageDelta {
                stop_reason: Some(StopReason::end_turn()),
                stop_sequence: None,
            },
            usage: ClaudeUsage {
                input_tokens: Some(10),
                output_tokens: Some(2),
                ..ClaudeUsage::default()
            },
        }),
        ClaudeStreamEvent::Known(StreamEventKnown::MessageStop),
    ];

    let mut transformer = StreamTransformer::new(Proto::Claude, Proto::OpenAIChat, "m").unwrap();
    let mut chunks: Vec<ChatCompletionChunk> = Vec::new();
    for event in events {
        for chunk in transformer.transform_chunk(StreamChunk::Claude(event)).unwrap() {
            match chunk {
                StreamChunk::OpenAIChat(chunk) => chunks.push(chunk),
                other => panic!("unexpected chunk: {other:?}"),
            }
        }
    }
    for chunk in transformer.finish() {
        match chunk {
            StreamChunk::OpenAIChat(chunk) => chunks.push(chunk),
            other => panic!("unexpected chunk: {other:?}"),
        }
    }

    let text: String = chunks
        .iter()
        .filter_map(|chunk| chunk.choices.first())
        .filter_map(|choice| choice.delta.content.clone())
        .collect();
    assert_eq!(text, "Hi there");

    let last = chunks
        .iter()
        .rev()
        .find(|chunk| {
            chunk
                .choices
                .first()
                .is_some_and(|choice| choice.finish_reason.is_some())
        })
        .expect("terminal chunk");
    assert_eq!(
        last.choices[0].finish_reason,
        Some(FinishReason::Known(KnownFinishReason::Stop))
    );
    let usage = last.usage.as_ref().expect("terminal usage");
    assert_eq!(usage.prompt_tokens, 10);
    assert_eq!(usage.completion_tokens, 2);
}

#[test]
fn openai_stream_to_claude_reconstructs_text() {
    let chunks = vec![
        openai_chunk(
            StreamDelta {
                role: Some(aigw_protocol::openai::chat_completions::stream::StreamRole::Assistant),
                ..StreamDelta::default()
            },
            None,
        ),
        openai_chunk(
            StreamDelta {
                content: Some("Hi".to_string()),
                ..StreamDelta::default()
            },
            None,
        ),
        openai_chunk(
            StreamDelta {
                content: Some(" there".to_string()),
                ..StreamDelta::default()
            },
            None,
        ),
        openai_chunk(StreamDelta::default(), Some(FinishReason::stop())),
    ];

    let mut transformer = StreamTransformer::new(Proto::OpenAIChat, Proto::Claude, "m").unwrap();
    let mut events = Vec::new();
    for chunk in chunks {
        events.extend(
            transformer
                .transform_chunk(StreamChunk::OpenAIChat(chunk))
                .unwrap(),
        );
    }
    events.extend(transformer.finish());

    let mut text = String::new();
    let mut saw_message_stop = false;
    let mut stop_reason = None;
    for event in &events {
        let StreamChunk::Claude(ClaudeStreamEvent::Known(event)) = event else {
            panic!("unexpected event: {event:?}");
        };
        match event {
            StreamEventKnown::ContentBlockDelta {
                delta: ContentBlockDelta::TextDelta { text: delta },
                ..
            } => text.push_str(delta),
            StreamEventKnown::MessageDelta { delta, .. } => {
                stop_reason = delta.stop_reason.clone();
            }
            StreamEventKnown::MessageStop => saw_message_stop = true,
            _ => {}
        }
    }
    assert_eq!(text, "Hi there");
    assert_eq!(stop_reason, Some(StopReason::end_turn()));
    assert!(saw_message_stop);
}

#[test]
fn gemini_stream_function_call_keeps_id_toward_openai() {
    let chunk = GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                role: Some(ContentRole::Model),
                parts: vec![Part::function_call(GeminiFunctionCall {
                    id: Some("call_abc".to_string()),
                    name: "lookup".to_string(),
                    args: Some(json!({"q": "rust"})),
                })],
            }),
            finish_reason: Some(GeminiFinishReason::stop()),
            index: Some(0),
        }],
        usage_metadata: None,
        model_version: Some("gemini-2.5-pro".to_string()),
        response_id: Some("resp_1".to_string()),
    };

    let mut transformer = StreamTransformer::new(Proto::Gemini, Proto::OpenAIChat, "gemini-2.5-pro")
        .unwrap();
    let out = transformer
        .transform_chunk(StreamChunk::Gemini(chunk))
        .unwrap();

    let mut tool_call_id = None;
    let mut finish_reason = None;
    for chunk in &out {
        let StreamChunk::OpenAIChat(chunk) = chunk else {
            panic!("unexpected chunk: {chunk:?}");
        };
        let choice = &chunk.choices[0];
        if let Some(tool_calls) = &choice.delta.tool_calls {
            tool_call_id = tool_calls[0].id.clone();
        }
        if choice.finish_reason.is_some() {
            finish_reason = choice.finish_reason.clone();
        }
    }
    assert_eq!(tool_call_id.as_deref(), Some("call_abc"));
    assert_eq!(
        finish_reason,
        Some(FinishReason::Known(KnownFinishReason::ToolCalls))
    );
}

#[test]
fn unknown_finish_reasons_pass_through() {
    let response = aigw_protocol::claude::messages::MessagesResponse {
        id: "msg_1".to_string(),
        r#type: aigw_protocol::claude::messages::MessageType::Message,
        role: MessageRole::Assistant,
        content: vec![ClaudeBlock::Text {
            text: "ok".to_string(),
        }],
        model: "claude-sonnet-4-5".to_string(),
        stop_reason: Some(StopReason::Other("weird_reason".to_string())),
        stop_sequence: None,
        usage: ClaudeUsage::default(),
    };

    let converted = crate::dispatch::convert_response(
        crate::dispatch::GenerateResponse::Claude(response),
        Proto::OpenAIChat,
        "m",
    )
    .unwrap();
    let crate::dispatch::GenerateResponse::OpenAIChat(response) = converted else {
        panic!("unexpected response");
    };
    assert_eq!(
        response.choices[0].finish_reason,
        Some(FinishReason::Other("weird_reason".to_string()))
    );
}

#[test]
fn model_list_fabricates_stable_defaults() {
    let gemini = aigw_protocol::gemini::models::ModelListResponse {
        models: vec![aigw_protocol::gemini::models::ModelInfo {
            name: "models/gemini-2.5-pro".to_string(),
            display_name: None,
            description: None,
            version: None,
            input_token_limit: None,
            output_token_limit: None,
            supported_generation_methods: None,
        }],
        next_page_token: None,
    };
    let converted = convert_model_list(ModelList::Gemini(gemini), Proto::OpenAIChat).unwrap();
    let ModelList::OpenAI(list) = converted else {
        panic!("unexpected list");
    };
    assert_eq!(list.data[0].id, "gemini-2.5-pro");
    assert_eq!(list.data[0].owned_by, "google");
    assert!(list.data[0].created > 0);

    let openai = OpenAIModelListResponse {
        object: ListObjectType::List,
        data: vec![Model {
            id: "gpt-test".to_string(),
            object: ModelObjectType::Model,
            created: 1_700_000_000,
            owned_by: "openai".to_string(),
        }],
    };
    let converted = convert_model_list(ModelList::OpenAI(openai), Proto::Claude).unwrap();
    let ModelList::Claude(list) = converted else {
        panic!("unexpected list");
    };
    assert_eq!(list.data[0].display_name.as_deref(), Some("gpt-test"));
    assert!(list.data[0].created_at.as_deref().unwrap().starts_with("2023"));
}
