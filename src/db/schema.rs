table! {
    meetup_participations (id) {
        id -> Int8,
        user_id -> Int8,
        meetup_id -> Int8,
        status -> Text,
        requested_at -> Timestamptz,
        approved_at -> Nullable<Timestamptz>,
    }
}

table! {
    meetups (id) {
        id -> Int8,
        organizer -> Int8,
        title -> Varchar,
        description -> Text,
        is_open -> Bool,
        max_participants -> Nullable<Int8>,
        start_datetime -> Timestamptz,
        duration_minutes -> Int8,
        location_text -> Varchar,
        online_link -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    users (id) {
        id -> Int8,
        sub -> Varchar,
        email -> Varchar,
        display_name -> Varchar,
        id_token_exp -> Int8,
    }
}

joinable!(meetups -> users (organizer));
joinable!(meetup_participations -> meetups (meetup_id));
joinable!(meetup_participations -> users (user_id));

allow_tables_to_appear_in_same_query!(meetup_participations, meetups, users,);
