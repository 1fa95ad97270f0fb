use unicode_segmentation::UnicodeSegmentation;

#[derive(Clone, Debug)]
pub struct ChunkingConfig {
	pub chunk_size: u32,
	pub chunk_overlap: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
	pub chunk_index: u32,
	pub start_offset: usize,
	pub end_offset: usize,
	pub text: String,
}

/// Splits text into bounded, overlapping windows on sentence boundaries.
/// Budgets are in characters; a single sentence longer than the budget still
/// becomes its own chunk rather than being dropped.
pub fn split_text(text: &str, cfg: &ChunkingConfig) -> Vec<Chunk> {
	let sentences: Vec<(usize, &str)> = text.split_sentence_bound_indices().collect();
	let mut chunks = Vec::new();
	let mut current = String::new();
	let mut current_start = 0_usize;
	let mut last_end = 0_usize;
	let mut chunk_index = 0_u32;

	for (idx, sentence) in sentences {
		let candidate_len = current.chars().count() + sentence.chars().count();

		if candidate_len as u32 > cfg.chunk_size && !current.is_empty() {
			chunks.push(Chunk {
				chunk_index,
				start_offset: current_start,
				end_offset: last_end,
				text: current.clone(),
			});

			chunk_index += 1;

			let overlap = overlap_tail(&current, cfg.chunk_overlap);

			current_start = last_end.saturating_sub(overlap.len());
			current = overlap;
		}
		if current.is_empty() {
			current_start = idx;
		}

		current.push_str(sentence);

		last_end = idx + sentence.len();
	}

	if !current.trim().is_empty() {
		chunks.push(Chunk {
			chunk_index,
			start_offset: current_start,
			end_offset: last_end,
			text: current,
		});
	}

	chunks
}

fn overlap_tail(text: &str, overlap_chars: u32) -> String {
	if overlap_chars == 0 {
		return String::new();
	}

	let count = text.chars().count();
	let skip = count.saturating_sub(overlap_chars as usize);

	text.chars().skip(skip).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn short_text_stays_in_one_chunk() {
		let cfg = ChunkingConfig { chunk_size: 100, chunk_overlap: 10 };
		let chunks = split_text("One. Two. Three.", &cfg);

		assert_eq!(chunks.len(), 1);
		assert_eq!(chunks[0].chunk_index, 0);
		assert_eq!(chunks[0].text, "One. Two. Three.");
	}

	#[test]
	fn splits_on_sentence_boundaries_with_overlap() {
		let cfg = ChunkingConfig { chunk_size: 24, chunk_overlap: 6 };
		let text = "First sentence here. Second sentence here. Third sentence here.";
		let chunks = split_text(text, &cfg);

		assert!(chunks.len() >= 2);
		assert!(chunks[0].text.contains("First"));

		for window in chunks.windows(2) {
			assert_eq!(window[1].chunk_index, window[0].chunk_index + 1);

			// Each chunk starts with the tail of the previous one.
			let tail = overlap_tail(&window[0].text, cfg.chunk_overlap);

			assert!(window[1].text.starts_with(&tail));
		}
	}

	#[test]
	fn oversized_sentence_becomes_its_own_chunk() {
		let cfg = ChunkingConfig { chunk_size: 8, chunk_overlap: 2 };
		let chunks = split_text("An unbroken run of words without a period", &cfg);

		assert_eq!(chunks.len(), 1);
	}

	#[test]
	fn empty_text_produces_no_chunks() {
		let cfg = ChunkingConfig { chunk_size: 10, chunk_overlap: 2 };

		assert!(split_text("", &cfg).is_empty());
		assert!(split_text("   ", &cfg).is_empty());
	}

	#[test]
	fn offsets_cover_the_source_text() {
		let cfg = ChunkingConfig { chunk_size: 20, chunk_overlap: 0 };
		let text = "Alpha beta gamma. Delta epsilon zeta. Eta theta iota.";
		let chunks = split_text(text, &cfg);

		assert_eq!(chunks.first().map(|chunk| chunk.start_offset), Some(0));
		assert_eq!(chunks.last().map(|chunk| chunk.end_offset), Some(text.len()));
	}
}
