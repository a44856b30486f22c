pub mod transactions {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "transactions")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub tx_hash: String,
        pub from_address: String,
        pub to_address: String,
        #[sea_orm(column_type = "Double")]
        pub amount: f64,
        pub watched_address: String,
        pub block_time: i64,
        pub asset: AssetTypeDb,
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
    #[sea_orm(rs_type = "String", db_type = "String(Some(8))")]
    pub enum AssetTypeDb {
        #[sea_orm(string_value = "USDC")]
        Usdc,
        #[sea_orm(string_value = "SOL")]
        Sol,
    }

    #[derive(Debug, Clone, Copy, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
