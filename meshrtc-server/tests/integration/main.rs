mod utils;

mod messaging_tests;
mod multi_peer_tests;
