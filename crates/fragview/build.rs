use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use shaderprep::{Preprocessor, DEBUG_SYMBOL};

fn main() {
    let dest = env::var("OUT_DIR").unwrap();
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();

    println!("cargo:rerun-if-env-changed=FRAGVIEW_SHADER");
    let shader = match env::var_os("FRAGVIEW_SHADER") {
        Some(path) => PathBuf::from(path),
        None => Path::new(&manifest_dir).join("../../shaders/fshader.glsl"),
    };
    println!("cargo:rerun-if-changed={}", shader.display());

    let raw = fs::read_to_string(&shader)
        .unwrap_or_else(|err| panic!("failed to read {}: {err}", shader.display()));

    // Release builds never see the debug regions.
    let stripped = Preprocessor::new()
        .undefine(DEBUG_SYMBOL)
        .process(&raw)
        .unwrap_or_else(|err| panic!("failed to preprocess {}: {err}", shader.display()));

    fs::write(Path::new(&dest).join("fshader-release.glsl"), stripped).unwrap();
}
