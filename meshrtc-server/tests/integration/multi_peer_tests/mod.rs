mod test_one_room_invariant;
mod test_three_peer_signaling;
