//! Puts `memory.x` on the linker search path

use std::{env, fs::File, io::Write, path::PathBuf};

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(include_bytes!("memory.x")).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}
