//! Build script compiling `proto/agent_trust.proto` into Rust service and
//! message types via `tonic-build`, the same way the reference workspace's
//! `crates/crypto/build.rs` compiles its own signing proto.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile(&["proto/agent_trust.proto"], &["proto"])?;
    Ok(())
}
