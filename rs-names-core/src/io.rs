use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::{fs, io};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Reads a corpus of names from a file.
///
/// - `.json` files are parsed as a JSON array of strings
/// - Any other file is split on `\n` / `\r\n`, skipping empty lines
pub fn read_names<P: AsRef<Path>>(filename: P) -> Result<Vec<String>, Box<dyn std::error::Error>> {
	let mut contents = String::new();
	File::open(&filename)?.read_to_string(&mut contents)?;

	if filename.as_ref().extension() == Some(std::ffi::OsStr::new("json")) {
		Ok(serde_json::from_str(&contents)?)
	} else {
		Ok(contents
			.lines()
			.filter(|line| !line.is_empty())
			.map(str::to_owned)
			.collect())
	}
}

/// Writes a value to a file as compact JSON.
pub fn write_json<P: AsRef<Path>, T: Serialize>(
	filename: P,
	value: &T,
) -> Result<(), Box<dyn std::error::Error>> {
	fs::write(filename, serde_json::to_string(value)?)?;
	Ok(())
}

/// Reads a JSON file into a value.
pub fn read_json<P: AsRef<Path>, T: DeserializeOwned>(
	filename: P,
) -> Result<T, Box<dyn std::error::Error>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(serde_json::from_str(&contents)?)
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `data/names.json` + `"seq3.bin"` → `data/names.seq3.bin`
pub fn build_output_path<P: AsRef<Path>>(
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

/// Lists all files with a given extension in a directory.
///
/// Returns file names only (no paths).
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_build_output_path_swaps_extension() {
		let path = build_output_path("data/names.json", "seq3.bin").unwrap();
		assert_eq!(path, PathBuf::from("data/names.seq3.bin"));
	}

	#[test]
	fn test_read_names_parses_json_and_lines() {
		let dir = std::env::temp_dir().join("rs_names_io_test");
		fs::create_dir_all(&dir).unwrap();

		let json_path = dir.join("names.json");
		fs::write(&json_path, r#"["anna","ben"]"#).unwrap();
		assert_eq!(read_names(&json_path).unwrap(), vec!["anna", "ben"]);

		let text_path = dir.join("names.txt");
		fs::write(&text_path, "anna\n\nben\n").unwrap();
		assert_eq!(read_names(&text_path).unwrap(), vec!["anna", "ben"]);
	}
}
