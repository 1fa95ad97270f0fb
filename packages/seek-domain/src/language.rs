use serde::{Deserialize, Serialize};

/// Languages the analysis configuration carries dedicated analyzers for.
/// Everything else, including low-confidence detections, lands in [`Und`].
///
/// [`Und`]: LanguageCode::Und
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
	Fr,
	En,
	De,
	Nl,
	Und,
}
impl LanguageCode {
	pub const ALL: [Self; 5] = [Self::Fr, Self::En, Self::De, Self::Nl, Self::Und];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Fr => "fr",
			Self::En => "en",
			Self::De => "de",
			Self::Nl => "nl",
			Self::Und => "und",
		}
	}

	pub fn from_tag(tag: &str) -> Option<Self> {
		match tag {
			"fr" => Some(Self::Fr),
			"en" => Some(Self::En),
			"de" => Some(Self::De),
			"nl" => Some(Self::Nl),
			"und" => Some(Self::Und),
			_ => None,
		}
	}
}

/// Picks the language field pair a document's text is stored under. Runs at
/// write time only; queries fan out over every language variant instead.
pub fn detect_language(cfg: &seek_config::Language, title: &str, content: &str) -> LanguageCode {
	let sample = if content.trim().is_empty() {
		title.to_string()
	} else {
		format!("{title}\n{content}")
	};
	let Some(info) = whatlang::detect(&sample) else {
		return LanguageCode::Und;
	};

	if info.confidence() < cfg.confidence_threshold {
		return LanguageCode::Und;
	}

	match info.lang() {
		whatlang::Lang::Fra => LanguageCode::Fr,
		whatlang::Lang::Eng => LanguageCode::En,
		whatlang::Lang::Deu => LanguageCode::De,
		whatlang::Lang::Nld => LanguageCode::Nl,
		_ => LanguageCode::Und,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cfg(confidence_threshold: f64) -> seek_config::Language {
		seek_config::Language { confidence_threshold }
	}

	#[test]
	fn detects_supported_languages() {
		let french = "Bonjour, je souhaite retrouver ce document dans les resultats de recherche.";
		let english = "The quick brown fox jumps over the lazy dog near the river bank today.";

		assert_eq!(detect_language(&cfg(0.2), french, ""), LanguageCode::Fr);
		assert_eq!(detect_language(&cfg(0.2), english, ""), LanguageCode::En);
	}

	#[test]
	fn low_confidence_falls_back_to_und() {
		assert_eq!(detect_language(&cfg(1.0), "ok", ""), LanguageCode::Und);
	}

	#[test]
	fn unsupported_language_falls_back_to_und() {
		let russian = "Привет, это документ на русском языке, которого нет в списке анализаторов.";

		assert_eq!(detect_language(&cfg(0.2), russian, ""), LanguageCode::Und);
	}

	#[test]
	fn tags_round_trip() {
		for code in LanguageCode::ALL {
			assert_eq!(LanguageCode::from_tag(code.as_str()), Some(code));
		}
		assert_eq!(LanguageCode::from_tag("es"), None);
	}
}
