//! Build script for compiling protobuf definitions

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse with protox so no system protoc is needed
    let file_descriptors = protox::compile(["proto/drishti.proto"], ["proto/"])?;
    prost_build::Config::new().compile_fds(file_descriptors)?;

    // Rerun if proto files change
    println!("cargo:rerun-if-changed=proto/drishti.proto");

    Ok(())
}
