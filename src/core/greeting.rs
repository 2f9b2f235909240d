use chrono::{Local, Timelike};

/// Welcome line for an empty transcript, picked by local hour (0-23).
pub fn greeting_for_hour(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Good morning! How can I help you today?",
        12..=16 => "Good afternoon! What would you like to know?",
        17..=21 => "Good evening! How may I assist you?",
        _ => "Hello! What can I help you with today?",
    }
}

pub fn greeting_now() -> &'static str {
    greeting_for_hour(Local::now().hour())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_follows_time_of_day() {
        assert!(greeting_for_hour(5).starts_with("Good morning"));
        assert!(greeting_for_hour(11).starts_with("Good morning"));
        assert!(greeting_for_hour(12).starts_with("Good afternoon"));
        assert!(greeting_for_hour(16).starts_with("Good afternoon"));
        assert!(greeting_for_hour(17).starts_with("Good evening"));
        assert!(greeting_for_hour(21).starts_with("Good evening"));
    }

    #[test]
    fn late_night_uses_generic_greeting() {
        for hour in [22, 23, 0, 4] {
            assert!(greeting_for_hour(hour).starts_with("Hello!"), "hour {hour}");
        }
    }
}
