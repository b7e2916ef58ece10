fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use the vendored protoc so builds do not depend on a system install
    if let Ok(path) = protoc_bin_vendored::protoc_bin_path() {
        std::env::set_var("PROTOC", path);
    }

    println!("cargo:rerun-if-changed=proto/channel.proto");

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile(&["proto/channel.proto"], &["proto"])?;
    Ok(())
}
