// 构建脚本: 静态链接FFmpeg时补充系统依赖库
fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // 只有启用 ffmpeg feature 时才需要
    if std::env::var_os("CARGO_FEATURE_FFMPEG").is_none() {
        return;
    }

    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_env = std::env::var("CARGO_CFG_TARGET_ENV").unwrap_or_default();

    // vcpkg 静态库 (Windows MSVC)
    if target_os == "windows" && target_env == "msvc" {
        // OLE 自动化和VFW
        println!("cargo:rustc-link-lib=dylib=oleaut32");
        println!("cargo:rustc-link-lib=dylib=vfw32");

        // Secure Channel (TLS/SSL)
        println!("cargo:rustc-link-lib=dylib=secur32");
    }
}
