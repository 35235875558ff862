use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
/// - Invalid UTF-8 is replaced rather than rejected; chat logs often mix encodings
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut contents = Vec::new();
	File::open(filename)?.read_to_end(&mut contents)?;
	Ok(String::from_utf8_lossy(&contents).lines().map(str::to_owned).collect())
}

/// Builds a sibling path of `input_path` with a new extension.
///
/// Example:
/// `data/chains.bin` + `"tmp"` → `data/chains.tmp`
pub(crate) fn build_output_path<P: AsRef<Path>>(
	input_path: P,
	output_extension: &str,
) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Writes `bytes` to a temporary sibling file, then renames it over `path`.
///
/// A crash mid-write leaves the previous file intact.
pub(crate) fn write_file_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
	let path = path.as_ref();
	let temporary = build_output_path(path, "tmp")?;
	fs::write(&temporary, bytes)?;
	fs::rename(&temporary, path)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn output_path_swaps_extension() {
		let out = build_output_path("data/chains.bin", "tmp").unwrap();
		assert_eq!(out, PathBuf::from("data/chains.tmp"));
		assert!(build_output_path("", "tmp").is_err());
	}

	#[test]
	fn atomic_write_then_read_lines() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("lines.txt");
		write_file_atomic(&path, b"one\r\ntwo\nthree").unwrap();
		assert_eq!(read_file(&path).unwrap(), ["one", "two", "three"]);
		assert!(!dir.path().join("lines.tmp").exists());
	}
}
