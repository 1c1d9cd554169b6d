use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

static CHANNEL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-=@,.;]+$").expect("channel name regex"));

/// Channel names are limited to the Pusher alphabet.
pub fn is_channel_name_valid(name: &str) -> bool {
    CHANNEL_NAME_RE.is_match(name)
}

pub fn is_presence_channel(name: &str) -> bool {
    name.starts_with("presence-")
}

pub fn is_private_channel(name: &str) -> bool {
    name.starts_with("private-")
}

pub fn is_client_event(event: &str) -> bool {
    event.starts_with("client-")
}

/// Socket ids are two random 31-bit integers joined by a dot, e.g. `1042.2158`.
pub fn generate_socket_id() -> String {
    let mut rng = rand::rng();
    format!(
        "{}.{}",
        rng.random_range(0..1u32 << 31),
        rng.random_range(0..1u32 << 31)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_id_is_two_dotted_integers() {
        let re = Regex::new(r"^\d+\.\d+$").unwrap();
        for _ in 0..32 {
            let id = generate_socket_id();
            assert!(re.is_match(&id), "bad socket id: {id}");
            for part in id.split('.') {
                assert!(part.parse::<u32>().unwrap() < 1 << 31);
            }
        }
    }

    #[test]
    fn channel_name_validation() {
        assert!(is_channel_name_valid("public"));
        assert!(is_channel_name_valid("private-hello"));
        assert!(is_channel_name_valid("presence-hello"));
        assert!(is_channel_name_valid("a_b-c=d@e,f.g;h"));
        assert!(!is_channel_name_valid("#@#hhh**sasas"));
        assert!(!is_channel_name_valid(""));
        assert!(!is_channel_name_valid("has space"));
    }

    #[test]
    fn prefix_predicates() {
        assert!(is_presence_channel("presence-hello"));
        assert!(!is_presence_channel("hello"));
        assert!(is_private_channel("private-hello"));
        assert!(!is_private_channel("hello"));
        assert!(is_client_event("client-typing"));
        assert!(!is_client_event("pusher:ping"));
    }
}
