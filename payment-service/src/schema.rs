diesel::table! {
    payments (id) {
        id -> Uuid,
        booking_id -> Uuid,
        user_id -> Uuid,
        amount -> Numeric,
        currency -> Varchar,
        payment_method -> Varchar,
        status -> Varchar,
        transaction_id -> Nullable<Varchar>,
        gateway_response -> Nullable<Varchar>,
        payment_date -> Timestamptz,
        created_at -> Timestamptz,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    outbox_events (id) {
        id -> Uuid,
        dedup_key -> Varchar,
        envelope -> Jsonb,
        processed -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(payments, outbox_events);
