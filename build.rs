fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // ESP-IDF environment is only needed for firmware builds; host builds
    // (tests, check-config) skip it
    let target = std::env::var("TARGET").unwrap_or_default();
    if target.contains("xtensa") || target.ends_with("-espidf") {
        embuild::espidf::sysenv::output();
    }
}
