use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=MATVEC_BLAS_LIB");
    println!("cargo:rerun-if-env-changed=MATVEC_BLAS_DIR");

    // Only the CBLAS oracle needs link lines
    if env::var_os("CARGO_FEATURE_CBLAS").is_none() {
        return;
    }

    // Library name without the `lib` prefix: cblas, openblas, flexiblas, ...
    let lib = env::var("MATVEC_BLAS_LIB").unwrap_or_else(|_| "cblas".to_string());

    if let Ok(dir) = env::var("MATVEC_BLAS_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
    } else {
        println!("cargo:rustc-link-search=/usr/lib/x86_64-linux-gnu");
        println!("cargo:rustc-link-search=/usr/lib64");
        println!("cargo:rustc-link-search=/usr/local/lib");
    }

    println!("cargo:rustc-link-lib={lib}");
}
