fn main() {
    flagviz::app::run();
}
