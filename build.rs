fn main() {
    // ESP-IDF environment is only needed when building the target firmware;
    // host builds (tests, fuzzing) skip it.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
