fn main() {
    yamuna::main();
}
