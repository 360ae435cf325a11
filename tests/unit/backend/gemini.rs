use base64::Engine as _;

use super::*;
use crate::backend::ReferenceImage;

fn parse(json: &str) -> GenerateContentResponse {
    serde_json::from_str(json).unwrap()
}

#[test]
fn request_body_puts_references_before_prompt() {
    let refs = vec![ReferenceImage {
        mime_type: "image/png".to_string(),
        bytes: vec![1, 2, 3],
    }];
    let req = GenerateRequest {
        prompt: "make it blue",
        reference_images: &refs,
        timeout: None,
    };
    let body = serde_json::to_value(build_request_body(&req)).unwrap();

    let parts = body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0]["inline_data"]["mime_type"], "image/png");
    assert_eq!(parts[0]["inline_data"]["data"], "AQID");
    assert_eq!(parts[1]["text"], "make it blue");
    assert_eq!(
        body["generationConfig"]["responseModalities"],
        serde_json::json!(["TEXT", "IMAGE"])
    );
}

#[test]
fn extracts_first_inline_image() {
    let data = base64::engine::general_purpose::STANDARD.encode(b"png-bytes");
    let json = format!(
        r#"{{"candidates":[{{"content":{{"parts":[{{"text":"here you go"}},{{"inlineData":{{"mimeType":"image/png","data":"{data}"}}}}]}}}}]}}"#
    );
    assert_eq!(extract_image(parse(&json)).unwrap(), b"png-bytes");
}

#[test]
fn snake_case_inline_data_is_accepted() {
    let data = base64::engine::general_purpose::STANDARD.encode(b"x");
    let json = format!(
        r#"{{"candidates":[{{"content":{{"parts":[{{"inline_data":{{"mime_type":"image/png","data":"{data}"}}}}]}}}}]}}"#
    );
    assert_eq!(extract_image(parse(&json)).unwrap(), b"x");
}

#[test]
fn text_only_response_reports_text_and_finish_reason() {
    let json = r#"{"candidates":[{"content":{"parts":[{"text":"I cannot draw that."}]},"finishReason":"STOP"}]}"#;
    let msg = extract_image(parse(json)).unwrap_err().to_string();
    assert!(msg.contains("no image"));
    assert!(msg.contains("STOP"));
    assert!(msg.contains("I cannot draw that."));
}

#[test]
fn blocked_and_empty_responses_are_backend_errors() {
    let blocked = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
    let err = extract_image(parse(blocked)).unwrap_err();
    assert!(matches!(err, FlipbookError::Backend(_)));
    assert!(err.to_string().contains("SAFETY"));

    assert!(extract_image(parse("{}")).is_err());
}

#[test]
fn endpoint_and_missing_key() {
    let backend = GeminiBackend::new(
        "k",
        "http://localhost:9/",
        "gemini-test",
        Duration::from_secs(1),
    )
    .unwrap();
    assert_eq!(
        backend.endpoint(),
        "http://localhost:9/v1beta/models/gemini-test:generateContent"
    );

    let err = GeminiBackend::from_config(&Config::default()).err().unwrap();
    assert!(matches!(err, FlipbookError::Config(_)));
}

#[test]
fn truncate_limits_characters() {
    assert_eq!(truncate("abc", 5), "abc");
    assert_eq!(truncate("abcdef", 3), "abc…");
}
