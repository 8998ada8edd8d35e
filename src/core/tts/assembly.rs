//! Reassembly of synthesis response bodies.
//!
//! The endpoint answers either with one JSON object or with a stream of
//! newline-delimited fragments whose `data` chunks are consecutive pieces of
//! one base64 audio stream. [`assemble_response`] accepts both shapes.

use tracing::debug;

use super::error::SynthesisError;
use super::messages::ResponseFragment;

/// Audio assembled from a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledAudio {
    /// Concatenated base64 chunks, in arrival order.
    pub audio_base64: String,
    /// Status code of the last fragment processed.
    pub code: i64,
    /// Status message of the last fragment processed.
    pub message: String,
    /// Number of fragments that carried an audio chunk.
    pub chunk_count: usize,
}

fn check_status(fragment: &ResponseFragment, line: usize) -> Result<(), SynthesisError> {
    if fragment.is_fatal() {
        return Err(SynthesisError::UpstreamError {
            code: fragment.code,
            message: fragment.message.clone(),
        });
    }
    if !fragment.is_success() {
        debug!(
            line,
            code = fragment.code,
            message = %fragment.message,
            "Tolerating informational status code"
        );
    }
    Ok(())
}

/// Assemble a raw response body into a base64 audio payload.
pub fn assemble_response(body: &str) -> Result<AssembledAudio, SynthesisError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(SynthesisError::EmptyResponse);
    }

    let mut audio_base64 = String::new();
    let mut chunk_count = 0usize;
    let mut last: Option<ResponseFragment> = None;
    let mut fragment_count = 0usize;

    for (index, line) in trimmed
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
    {
        let fragment: ResponseFragment = serde_json::from_str(line).map_err(|e| {
            SynthesisError::MalformedResponse(format!("line {}: {e}", index + 1))
        })?;
        check_status(&fragment, index + 1)?;

        if let Some(ref chunk) = fragment.data {
            audio_base64.push_str(chunk);
            chunk_count += 1;
        }
        fragment_count += 1;
        last = Some(fragment);
    }

    if chunk_count == 0 {
        return assemble_single_object(trimmed, fragment_count);
    }

    if audio_base64.is_empty() {
        return Err(SynthesisError::EmptyAudioData);
    }

    // chunk_count > 0 guarantees at least one fragment was seen
    let (code, message) = last
        .map(|f| (f.code, f.message))
        .unwrap_or_default();

    debug!(
        fragments = fragment_count,
        chunks = chunk_count,
        audio_len = audio_base64.len(),
        "Assembled synthesis response"
    );

    Ok(AssembledAudio {
        audio_base64,
        code,
        message,
        chunk_count,
    })
}

/// Fallback for bodies where no line carried a chunk: treat the whole body as one object.
///
/// A body of several lines cannot parse as one object. Every one of those
/// lines already parsed as a fragment, so the failure is reported as
/// [`SynthesisError::EmptyAudioData`] rather than `MalformedResponse`.
/// A single line that fails to parse is `MalformedResponse`.
fn assemble_single_object(
    trimmed: &str,
    fragment_count: usize,
) -> Result<AssembledAudio, SynthesisError> {
    let fragment: ResponseFragment = match serde_json::from_str(trimmed) {
        Ok(fragment) => fragment,
        // Every line parsed on its own, so the stream is well formed but silent.
        Err(_) if fragment_count > 1 => return Err(SynthesisError::EmptyAudioData),
        Err(e) => return Err(SynthesisError::MalformedResponse(e.to_string())),
    };
    check_status(&fragment, 1)?;

    match fragment.data {
        Some(data) if !data.is_empty() => Ok(AssembledAudio {
            audio_base64: data,
            code: fragment.code,
            message: fragment.message,
            chunk_count: 1,
        }),
        _ => Err(SynthesisError::EmptyAudioData),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_fragment_concatenation() {
        let body = concat!(
            r#"{"code":0,"message":"ok","data":"AA"}"#,
            "\n",
            r#"{"code":0,"message":"ok","data":"BB"}"#,
            "\n",
            r#"{"code":0,"message":"done","data":""}"#,
        );
        let audio = assemble_response(body).unwrap();
        assert_eq!(audio.audio_base64, "AABB");
        assert_eq!(audio.message, "done");
        assert_eq!(audio.chunk_count, 3);
    }

    #[test]
    fn test_single_object() {
        let audio = assemble_response(r#"{"code":0,"message":"ok","data":"ZZZZ"}"#).unwrap();
        assert_eq!(audio.audio_base64, "ZZZZ");
        assert_eq!(audio.code, 0);
    }

    #[test]
    fn test_order_is_preserved_and_duplicates_kept() {
        let body = "{\"data\":\"CC\"}\n{\"data\":\"AA\"}\n{\"data\":\"CC\"}\n";
        assert_eq!(assemble_response(body).unwrap().audio_base64, "CCAACC");
    }

    #[test]
    fn test_blank_lines_and_crlf_are_skipped() {
        let body = "\r\n{\"code\":0,\"data\":\"QQ\"}\r\n\r\n   \n{\"code\":20000000,\"message\":\"OK\"}\r\n";
        let audio = assemble_response(body).unwrap();
        assert_eq!(audio.audio_base64, "QQ");
        assert_eq!(audio.code, 20_000_000);
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(assemble_response(""), Err(SynthesisError::EmptyResponse));
        assert_eq!(assemble_response("  \n\t\n "), Err(SynthesisError::EmptyResponse));
    }

    #[test]
    fn test_any_malformed_line_fails_whole_body() {
        let body = "{\"code\":0,\"data\":\"AA\"}\nnot json\n{\"code\":0,\"data\":\"BB\"}";
        match assemble_response(body) {
            Err(SynthesisError::MalformedResponse(msg)) => assert!(msg.contains("line 2")),
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_code_is_fatal() {
        let body = "{\"code\":0,\"data\":\"AA\"}\n{\"code\":-2,\"message\":\"engine crashed\"}";
        assert_eq!(
            assemble_response(body),
            Err(SynthesisError::UpstreamError {
                code: -2,
                message: "engine crashed".to_string()
            })
        );
    }

    #[test]
    fn test_positive_nonstandard_code_is_tolerated() {
        let body = "{\"code\":3031,\"message\":\"warming up\",\"data\":\"AA\"}\n{\"code\":0,\"data\":\"BB\"}";
        assert_eq!(assemble_response(body).unwrap().audio_base64, "AABB");
    }

    #[test]
    fn test_single_object_without_data() {
        assert_eq!(
            assemble_response(r#"{"code":0,"message":"ok"}"#),
            Err(SynthesisError::EmptyAudioData)
        );
        assert_eq!(
            assemble_response(r#"{"code":0,"message":"ok","data":""}"#),
            Err(SynthesisError::EmptyAudioData)
        );
        // positive non-success code without audio is still just "no audio"
        assert_eq!(
            assemble_response(r#"{"code":401,"message":"bad key"}"#),
            Err(SynthesisError::EmptyAudioData)
        );
    }

    #[test]
    fn test_status_only_stream_has_no_audio() {
        let body = "{\"code\":0,\"message\":\"start\"}\n{\"code\":20000000,\"message\":\"end\"}";
        assert_eq!(assemble_response(body), Err(SynthesisError::EmptyAudioData));

        // bare status lines are well formed, just silent
        assert_eq!(
            assemble_response("{\"code\":0}\n{\"code\":0}"),
            Err(SynthesisError::EmptyAudioData)
        );
    }

    #[test]
    fn test_null_status_fields_are_tolerated() {
        let body = "{\"code\":null,\"message\":null,\"data\":\"AA\"}\n{\"code\":0,\"data\":\"BB\"}";
        assert_eq!(assemble_response(body).unwrap().audio_base64, "AABB");
    }

    #[test]
    fn test_non_object_line_is_malformed() {
        assert!(matches!(
            assemble_response("42"),
            Err(SynthesisError::MalformedResponse(_))
        ));
    }
}
