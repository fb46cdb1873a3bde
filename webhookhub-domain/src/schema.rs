// @generated — mirrors the persisted state layout in spec §6.

diesel::table! {
    sources (id) {
        id -> Uuid,
        #[max_length = 100]
        name -> Varchar,
        hmac_secret -> Varchar,
        active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    destinations (id) {
        id -> Uuid,
        #[max_length = 100]
        name -> Varchar,
        target_url -> Varchar,
        active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    destination_rules (id) {
        id -> Uuid,
        destination_id -> Uuid,
        source_name -> Varchar,
        event_type -> Varchar,
    }
}

diesel::table! {
    events (id) {
        id -> Uuid,
        source_name -> Varchar,
        event_type -> Varchar,
        idempotency_key -> Varchar,
        payload_json -> Bytea,
        correlation_id -> Nullable<Varchar>,
        received_at -> Timestamptz,
    }
}

diesel::table! {
    deliveries (id) {
        id -> Uuid,
        event_id -> Uuid,
        destination_id -> Uuid,
        #[max_length = 20]
        status -> Varchar,
        attempts -> Int4,
        max_attempts -> Int4,
        last_error -> Nullable<Text>,
        last_attempt_at -> Nullable<Timestamptz>,
        delivered_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(destination_rules -> destinations (destination_id));
diesel::joinable!(deliveries -> events (event_id));
diesel::joinable!(deliveries -> destinations (destination_id));

diesel::allow_tables_to_appear_in_same_query!(
    sources,
    destinations,
    destination_rules,
    events,
    deliveries,
);
