fn main() -> Result<(), Box<dyn std::error::Error>> {
    let protos = ["proto/auth.proto", "proto/storage.proto"];

    for proto in &protos {
        println!("cargo:rerun-if-changed={}", proto);
    }

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&protos, &["proto/"])?;

    Ok(())
}
