use chrono::Utc;
use uuid::Uuid;

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const RANDOM_SUFFIX_LEN: usize = 6;
const MAX_USER_ID_LEN: usize = 50;

/// Build a user id from the phone digits, the current time in milliseconds
/// and six random alphanumerics, truncated to 50 characters
pub fn generate_user_id(phone_number: &str) -> String {
    let digits: String = phone_number.chars().filter(char::is_ascii_digit).collect();
    let timestamp = Utc::now().timestamp_millis();

    let random = Uuid::new_v4();
    let suffix: String = random
        .as_bytes()
        .iter()
        .take(RANDOM_SUFFIX_LEN)
        .map(|b| ID_ALPHABET[*b as usize % ID_ALPHABET.len()] as char)
        .collect();

    let mut id = format!("{}{}{}", digits, timestamp, suffix);
    id.truncate(MAX_USER_ID_LEN);
    id
}

/// Lowercase, then uppercase the first letter of every space-separated word
pub fn capitalize_words(input: &str) -> String {
    input
        .to_lowercase()
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
