use barrel::backend::Pg;
use barrel::{types, Migration};

pub fn migration() -> String {
    let mut m = Migration::new();

    m.create_table("users", |table| {
        table.add_column("id", types::custom("BIGSERIAL").primary(true));
        table.add_column("sub", types::varchar(255).unique(true).nullable(false));
        table.add_column("email", types::varchar(320).nullable(false));
        table.add_column("display_name", types::varchar(255).nullable(false));
        table.add_column("id_token_exp", types::custom("BIGINT").nullable(false));
    });

    m.create_table("meetups", |table| {
        table.add_column("id", types::custom("BIGSERIAL").primary(true));
        table.add_column(
            "organizer",
            types::custom("BIGINT REFERENCES users(id) ON DELETE CASCADE").nullable(false),
        );
        table.add_column("title", types::varchar(200).nullable(false));
        table.add_column("description", types::custom("TEXT").nullable(false));
        table.add_column("is_open", types::boolean().nullable(false));
        table.add_column("max_participants", types::custom("BIGINT").nullable(true));
        table.add_column("start_datetime", types::custom("TIMESTAMPTZ").nullable(false));
        table.add_column("duration_minutes", types::custom("BIGINT").nullable(false));
        table.add_column("location_text", types::varchar(255).nullable(false));
        table.add_column("online_link", types::varchar(2048).nullable(true));
        table.add_column(
            "created_at",
            types::custom("TIMESTAMPTZ DEFAULT now()").nullable(false),
        );
        table.add_column(
            "updated_at",
            types::custom("TIMESTAMPTZ DEFAULT now()").nullable(false),
        );
    });

    m.create_table("meetup_participations", |table| {
        table.add_column("id", types::custom("BIGSERIAL").primary(true));
        table.add_column(
            "user_id",
            types::custom("BIGINT REFERENCES users(id) ON DELETE CASCADE").nullable(false),
        );
        table.add_column(
            "meetup_id",
            types::custom("BIGINT REFERENCES meetups(id) ON DELETE CASCADE").nullable(false),
        );
        table.add_column(
            "status",
            types::custom("VARCHAR(20) DEFAULT 'pending'").nullable(false),
        );
        table.add_column(
            "requested_at",
            types::custom("TIMESTAMPTZ DEFAULT now()").nullable(false),
        );
        table.add_column("approved_at", types::custom("TIMESTAMPTZ").nullable(true));
        // one participation per user and meetup, the join command relies on this
        table.inject_custom("UNIQUE (user_id, meetup_id)");
    });

    m.make::<Pg>()
}
