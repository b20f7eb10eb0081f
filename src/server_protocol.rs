use serde_json::Value;

use crate::types::Direction;

#[derive(Debug)]
pub enum ParsedClientMessage {
    Hello {
        name: String,
        player_id: Option<String>,
        character: Option<String>,
    },
    Start {
        level: Option<i64>,
        seed: Option<i64>,
        maze: Option<String>,
        lives: Option<i64>,
    },
    Input {
        dir: Direction,
    },
    Pause,
    Resume,
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "hello" => {
            let name = object.get("name")?.as_str()?.to_string();
            let player_id = parse_optional_string(object.get("playerId"))?;
            let character = parse_optional_string(object.get("character"))?;
            Some(ParsedClientMessage::Hello {
                name,
                player_id,
                character,
            })
        }
        "start" => {
            let level = parse_optional_i64(object.get("level"))?;
            let seed = parse_optional_i64(object.get("seed"))?;
            let maze = parse_optional_string(object.get("maze"))?;
            let lives = parse_optional_i64(object.get("lives"))?;
            Some(ParsedClientMessage::Start {
                level,
                seed,
                maze,
                lives,
            })
        }
        "input" => {
            let dir = Direction::parse_move(object.get("dir")?.as_str()?)?;
            Some(ParsedClientMessage::Input { dir })
        }
        "pause" => Some(ParsedClientMessage::Pause),
        "resume" => Some(ParsedClientMessage::Resume),
        _ => None,
    }
}

fn parse_optional_string(value: Option<&Value>) -> Option<Option<String>> {
    match value {
        None | Some(Value::Null) => Some(None),
        Some(value) => Some(Some(value.as_str()?.to_string())),
    }
}

fn parse_optional_i64(value: Option<&Value>) -> Option<Option<i64>> {
    const MAX_SAFE_INTEGER_F64: f64 = 9_007_199_254_740_991.0;

    let Some(value) = value else {
        return Some(None);
    };
    if let Some(number) = value.as_i64() {
        return Some(Some(number));
    }
    if let Some(number) = value.as_u64() {
        return i64::try_from(number).ok().map(Some);
    }
    let number = value.as_f64()?;
    if !number.is_finite() {
        return None;
    }
    let floored = number.floor();
    if floored.abs() > MAX_SAFE_INTEGER_F64 {
        return None;
    }
    Some(Some(floored as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hello_message() {
        let parsed =
            parse_client_message(r#"{"type":"hello","name":"A","playerId":"p-1"}"#)
                .expect("hello message should parse");
        match parsed {
            ParsedClientMessage::Hello {
                name,
                player_id,
                character,
            } => {
                assert_eq!(name, "A");
                assert_eq!(player_id.as_deref(), Some("p-1"));
                assert_eq!(character, None);
            }
            _ => panic!("expected hello message"),
        }
    }

    #[test]
    fn parse_hello_rejects_non_string_fields() {
        assert!(parse_client_message(r#"{"type":"hello","name":3}"#).is_none());
        assert!(parse_client_message(r#"{"type":"hello","name":"A","playerId":7}"#).is_none());
    }

    #[test]
    fn parse_start_message() {
        let parsed = parse_client_message(
            r#"{"type":"start","level":3,"seed":99,"maze":"classic","lives":5}"#,
        )
        .expect("start message should parse");
        match parsed {
            ParsedClientMessage::Start {
                level,
                seed,
                maze,
                lives,
            } => {
                assert_eq!(level, Some(3));
                assert_eq!(seed, Some(99));
                assert_eq!(maze.as_deref(), Some("classic"));
                assert_eq!(lives, Some(5));
            }
            _ => panic!("expected start message"),
        }
    }

    #[test]
    fn parse_start_floors_floats_and_rejects_overflow() {
        let parsed = parse_client_message(r#"{"type":"start","level":2.7}"#);
        assert!(matches!(
            parsed,
            Some(ParsedClientMessage::Start {
                level: Some(2),
                ..
            })
        ));
        assert!(parse_client_message(r#"{"type":"start","seed":1e100}"#).is_none());
        assert!(
            parse_client_message(r#"{"type":"start","seed":18446744073709551615}"#).is_none()
        );
    }

    #[test]
    fn parse_input_requires_known_direction() {
        assert!(matches!(
            parse_client_message(r#"{"type":"input","dir":"left"}"#),
            Some(ParsedClientMessage::Input {
                dir: Direction::Left
            })
        ));
        assert!(parse_client_message(r#"{"type":"input","dir":"sideways"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"input"}"#).is_none());
    }

    #[test]
    fn parse_pause_and_resume() {
        assert!(matches!(
            parse_client_message(r#"{"type":"pause"}"#),
            Some(ParsedClientMessage::Pause)
        ));
        assert!(matches!(
            parse_client_message(r#"{"type":"resume"}"#),
            Some(ParsedClientMessage::Resume)
        ));
        assert!(parse_client_message(r#"{"type":"rewind"}"#).is_none());
        assert!(parse_client_message("not json").is_none());
    }
}
