use unicode_segmentation::UnicodeSegmentation;

/// Lowercased words in reading order.
pub fn words(text: &str) -> Vec<String> {
	text.unicode_words().map(str::to_lowercase).collect()
}

pub fn word_count(text: &str) -> usize {
	text.unicode_words().count()
}

/// Distinct lowercased terms strictly longer than `min_chars` characters, in first-seen order.
pub fn terms(text: &str, min_chars: usize) -> Vec<String> {
	let mut out: Vec<String> = Vec::new();

	for word in words(text) {
		if word.chars().count() > min_chars && !out.contains(&word) {
			out.push(word);
		}
	}

	out
}

/// Non-overlapping occurrences of `term` inside `text`, case-insensitive.
pub fn count_occurrences(text: &str, term: &str) -> usize {
	if term.is_empty() {
		return 0;
	}

	text.to_lowercase().matches(&term.to_lowercase()).count()
}

/// `95` -> `1h 35m`, `40` -> `40m`.
pub fn format_minutes(minutes: u32) -> String {
	let hours = minutes / 60;
	let rest = minutes % 60;

	match (hours, rest) {
		(0, rest) => format!("{rest}m"),
		(hours, 0) => format!("{hours}h"),
		(hours, rest) => format!("{hours}h {rest}m"),
	}
}
