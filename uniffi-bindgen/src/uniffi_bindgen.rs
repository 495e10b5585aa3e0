//! Generates Swift and Kotlin bindings for `CredKit`.

fn main() {
    uniffi::uniffi_bindgen_main();
}
