fn main() {
    uniffi::generate_scaffolding("src/rollcall.udl").unwrap();
}
