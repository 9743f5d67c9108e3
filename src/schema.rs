diesel::table! {
    links (id) {
        id -> BigInt,
        short_code -> Text,
        original_url -> Text,
        clicks -> BigInt,
    }
}
