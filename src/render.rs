use crate::core::{
    Card,
    CardKey,
};

pub fn format_card(card: &Card) -> String {
    let mut lines = vec!["\nGenerated card:".to_string()];
    for key in CardKey::ALL {
        if let Some(value) = card.get(key) {
            lines.push(format!("{}: {}", key, value));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::card_payload;

    #[test]
    fn test_format_card_follows_display_order() {
        let card = Card::from_payload(&card_payload("mat")).unwrap();
        let text = format_card(&card);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[1], "Generated card:");
        assert_eq!(lines[2], "word_base: mat");
        assert_eq!(lines[3], "part_of_speech: noun");
        assert_eq!(lines.last(), Some(&"level: A2"));
        assert!(!text.contains("tts_text"));
    }
}
