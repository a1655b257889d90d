use serde::{ Serialize, Deserialize };
use crate::view::View;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "select_model")] SelectModel {
        model: String,
    },
    #[serde(rename = "chat")] Chat {
        content: String,
    },
    #[serde(rename = "reset")]
    Reset,
    #[serde(rename = "refresh_models")]
    RefreshModels,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "render")] Render {
        view: View,
        timestamp: i64,
    },
    /// `partial` is the reply so far with the streaming cursor appended.
    #[serde(rename = "fragment")] Fragment {
        content: String,
        partial: String,
    },
    #[serde(rename = "error")] Error {
        message: String,
    },
    #[serde(rename = "processing")]
    Processing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_are_tagged_by_type() {
        let parsed: ClientMessage = serde_json
            ::from_str(r#"{"type":"select_model","model":"llama3"}"#)
            .unwrap();
        assert_eq!(parsed, ClientMessage::SelectModel { model: "llama3".into() });

        let parsed: ClientMessage = serde_json::from_str(r#"{"type":"reset"}"#).unwrap();
        assert_eq!(parsed, ClientMessage::Reset);

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"shutdown"}"#).is_err());
    }

    #[test]
    fn fragment_serializes_with_tag() {
        let json = serde_json
            ::to_value(ServerMessage::Fragment { content: "Hi".into(), partial: "Hi▌".into() })
            .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "fragment", "content": "Hi", "partial": "Hi▌" })
        );
    }
}
