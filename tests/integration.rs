//! End-to-end round trips through the public `Cmpaq` API: create an
//! archive from real files on disk, extract it elsewhere, and compare
//! bytes. Each test gets its own scratch directory under the system temp
//! dir so parallel test threads never collide.

use std::fs;
use std::path::PathBuf;

use cmarc::Cmpaq;

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cmarc_test_{tag}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn round_trips_a_single_text_file() {
    let dir = scratch_dir("single_text");
    let input = dir.join("hello.txt");
    fs::write(&input, b"hello, world! hello, world! hello, world!\n".repeat(20)).unwrap();

    let archive = dir.join("out.cma");
    Cmpaq::new()
        .archive(archive.to_str().unwrap())
        .inputs(&[input.to_str().unwrap()])
        .unwrap()
        .quiet()
        .create_archive()
        .unwrap();

    fs::remove_file(&input).unwrap();

    Cmpaq::new().archive(archive.to_str().unwrap()).quiet().extract_archive().unwrap();

    let recovered = fs::read(dir.join("hello.txt")).unwrap();
    assert_eq!(recovered, b"hello, world! hello, world! hello, world!\n".repeat(20));
}

#[test]
fn round_trips_an_empty_file() {
    let dir = scratch_dir("empty_file");
    let input = dir.join("empty.bin");
    fs::write(&input, []).unwrap();

    let archive = dir.join("out.cma");
    Cmpaq::new()
        .archive(archive.to_str().unwrap())
        .inputs(&[input.to_str().unwrap()])
        .unwrap()
        .quiet()
        .create_archive()
        .unwrap();

    fs::remove_file(&input).unwrap();
    Cmpaq::new().archive(archive.to_str().unwrap()).quiet().extract_archive().unwrap();

    let recovered = fs::read(dir.join("empty.bin")).unwrap();
    assert!(recovered.is_empty());
}

#[test]
fn round_trips_exe_like_bytes_with_call_instructions() {
    let dir = scratch_dir("exe_bytes");
    let input = dir.join("prog.exe");

    let mut data = vec![0u8; 4096];
    for i in (0..data.len() - 5).step_by(37) {
        data[i] = 0xE8;
        data[i + 1] = 0x10;
        data[i + 2] = 0x20;
        data[i + 3] = 0x00;
        data[i + 4] = 0x00;
    }
    fs::write(&input, &data).unwrap();

    let archive = dir.join("out.cma");
    Cmpaq::new()
        .archive(archive.to_str().unwrap())
        .inputs(&[input.to_str().unwrap()])
        .unwrap()
        .quiet()
        .create_archive()
        .unwrap();

    let original = fs::read(&input).unwrap();
    fs::remove_file(&input).unwrap();
    Cmpaq::new().archive(archive.to_str().unwrap()).quiet().extract_archive().unwrap();

    let recovered = fs::read(dir.join("prog.exe")).unwrap();
    assert_eq!(recovered, original);
}

#[test]
fn archives_multiple_files_together() {
    let dir = scratch_dir("multi_file");
    let a = dir.join("a.txt");
    let b = dir.join("b.txt");
    fs::write(&a, "first file contents\n".repeat(50)).unwrap();
    fs::write(&b, "second file is different\n".repeat(30)).unwrap();

    let archive = dir.join("bundle.cma");
    Cmpaq::new()
        .archive(archive.to_str().unwrap())
        .inputs(&[a.to_str().unwrap(), b.to_str().unwrap()])
        .unwrap()
        .quiet()
        .create_archive()
        .unwrap();

    let a_bytes = fs::read(&a).unwrap();
    let b_bytes = fs::read(&b).unwrap();
    fs::remove_file(&a).unwrap();
    fs::remove_file(&b).unwrap();

    Cmpaq::new().archive(archive.to_str().unwrap()).quiet().extract_archive().unwrap();

    assert_eq!(fs::read(dir.join("a.txt")).unwrap(), a_bytes);
    assert_eq!(fs::read(dir.join("b.txt")).unwrap(), b_bytes);
}

#[test]
fn extracting_onto_identical_file_does_not_error() {
    let dir = scratch_dir("identical");
    let input = dir.join("same.txt");
    fs::write(&input, "unchanged content\n".repeat(10)).unwrap();

    let archive = dir.join("out.cma");
    Cmpaq::new()
        .archive(archive.to_str().unwrap())
        .inputs(&[input.to_str().unwrap()])
        .unwrap()
        .quiet()
        .create_archive()
        .unwrap();

    // input file is left in place; extraction should detect it's identical
    // rather than failing because clobber() was not set.
    Cmpaq::new().archive(archive.to_str().unwrap()).quiet().extract_archive().unwrap();

    assert_eq!(fs::read(&input).unwrap(), "unchanged content\n".repeat(10).as_bytes());
}

#[test]
fn rejects_creating_archive_with_no_inputs() {
    let dir = scratch_dir("no_inputs");
    let archive = dir.join("empty.cma");
    let err = Cmpaq::new().archive(archive.to_str().unwrap()).create_archive().unwrap_err();
    println!("{err}");
}

#[test]
fn extracting_a_subset_of_names_only_writes_those_files() {
    let dir = scratch_dir("subset");
    let a = dir.join("keep.txt");
    let b = dir.join("skip.txt");
    fs::write(&a, "keep me\n".repeat(5)).unwrap();
    fs::write(&b, "skip me\n".repeat(5)).unwrap();

    let archive = dir.join("bundle.cma");
    Cmpaq::new()
        .archive(archive.to_str().unwrap())
        .inputs(&[a.to_str().unwrap(), b.to_str().unwrap()])
        .unwrap()
        .quiet()
        .create_archive()
        .unwrap();

    fs::remove_file(&a).unwrap();
    fs::remove_file(&b).unwrap();

    Cmpaq::new()
        .archive(archive.to_str().unwrap())
        .quiet()
        .extract_names(&["keep.txt"])
        .extract_archive()
        .unwrap();

    assert!(dir.join("keep.txt").exists());
    assert!(!dir.join("skip.txt").exists());
}
