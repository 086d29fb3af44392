//! Wire types for the `query_agent` protobuf package.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SnowflakeConnectionParams {
    #[prost(string, tag = "1")]
    pub account: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub user: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub password: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub database: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub schema: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnectionRequest {
    #[prost(oneof = "connection_request::ConnectionParams", tags = "1")]
    pub connection_params: ::core::option::Option<connection_request::ConnectionParams>,
}

pub mod connection_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ConnectionParams {
        #[prost(message, tag = "1")]
        SnowflakeConnectionParams(super::SnowflakeConnectionParams),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConnectionResponse {
    #[prost(string, tag = "1")]
    pub connection_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Query {
    #[prost(message, optional, tag = "3")]
    pub client_version: ::core::option::Option<ClientVersion>,
    #[prost(string, tag = "4")]
    pub select_from: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "5")]
    pub select: ::prost::alloc::vec::Vec<query::SelectExpression>,
    #[prost(message, optional, tag = "6")]
    pub filter: ::core::option::Option<query::BooleanExpression>,
    #[prost(message, repeated, tag = "7")]
    pub group_by: ::prost::alloc::vec::Vec<query::GroupByExpression>,
    #[prost(message, repeated, tag = "8")]
    pub order_by: ::prost::alloc::vec::Vec<query::OrderByExpression>,
    #[prost(uint64, optional, tag = "9")]
    pub limit: ::core::option::Option<u64>,
    #[prost(bool, optional, tag = "10")]
    pub dry_run: ::core::option::Option<bool>,
    #[prost(oneof = "query::Id", tags = "1, 2")]
    pub id: ::core::option::Option<query::Id>,
}

pub mod query {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Id {
        #[prost(string, tag = "1")]
        PackageId(::prost::alloc::string::String),
        #[prost(string, tag = "2")]
        ConnectionId(::prost::alloc::string::String),
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SelectExpression {
        #[prost(message, optional, tag = "1")]
        pub argument: ::core::option::Option<Expression>,
        #[prost(string, optional, tag = "2")]
        pub alias: ::core::option::Option<::prost::alloc::string::String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Expression {
        #[prost(oneof = "expression::ExType", tags = "1, 2, 3, 4, 5")]
        pub ex_type: ::core::option::Option<expression::ExType>,
    }

    pub mod expression {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum ExType {
            #[prost(message, tag = "1")]
            Field(super::FieldReference),
            #[prost(message, tag = "2")]
            Literal(super::Literal),
            #[prost(message, tag = "3")]
            Derived(super::DerivedExpression),
            #[prost(message, tag = "4")]
            Aggregate(super::AggregateExpression),
            #[prost(message, tag = "5")]
            Condition(super::BooleanExpression),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FieldReference {
        #[prost(string, tag = "1")]
        pub field_name: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Literal {
        #[prost(oneof = "literal::LiteralType", tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10")]
        pub literal_type: ::core::option::Option<literal::LiteralType>,
    }

    pub mod literal {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct List {
            #[prost(message, repeated, tag = "1")]
            pub values: ::prost::alloc::vec::Vec<super::Literal>,
        }

        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum LiteralType {
            #[prost(string, tag = "1")]
            String(::prost::alloc::string::String),
            #[prost(bool, tag = "2")]
            Boolean(bool),
            #[prost(int32, tag = "3")]
            I32(i32),
            #[prost(uint64, tag = "4")]
            Ui64(u64),
            #[prost(uint32, tag = "5")]
            Ui32(u32),
            #[prost(int64, tag = "6")]
            I64(i64),
            #[prost(float, tag = "7")]
            F32(f32),
            #[prost(double, tag = "8")]
            F64(f64),
            #[prost(int64, tag = "9")]
            Timestamp(i64),
            #[prost(message, tag = "10")]
            List(List),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct DerivedExpression {
        #[prost(message, optional, boxed, tag = "1")]
        pub argument: ::core::option::Option<::prost::alloc::boxed::Box<Expression>>,
        #[prost(enumeration = "derived_expression::ProjectionOperator", tag = "2")]
        pub op: i32,
    }

    pub mod derived_expression {
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
        )]
        #[repr(i32)]
        pub enum ProjectionOperator {
            Year = 0,
            Month = 1,
            Day = 2,
            Hour = 3,
            Minute = 4,
            Second = 5,
            Millisecond = 6,
            Date = 7,
            Time = 8,
            DayOfWeek = 9,
            Week = 10,
            DateOfWeek = 11,
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct AggregateExpression {
        #[prost(message, optional, boxed, tag = "1")]
        pub argument: ::core::option::Option<::prost::alloc::boxed::Box<Expression>>,
        #[prost(enumeration = "aggregate_expression::AggregateOperator", tag = "2")]
        pub op: i32,
    }

    pub mod aggregate_expression {
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
        )]
        #[repr(i32)]
        pub enum AggregateOperator {
            Min = 0,
            Max = 1,
            Mean = 2,
            Median = 3,
            Count = 4,
            CountDistinct = 5,
            Sum = 6,
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BooleanExpression {
        #[prost(enumeration = "boolean_expression::BooleanOperator", tag = "1")]
        pub op: i32,
        #[prost(message, repeated, tag = "2")]
        pub arguments: ::prost::alloc::vec::Vec<Expression>,
    }

    pub mod boolean_expression {
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
        )]
        #[repr(i32)]
        pub enum BooleanOperator {
            And = 0,
            Or = 1,
            Eq = 3,
            Neq = 4,
            Lt = 5,
            Lte = 6,
            Gt = 7,
            Gte = 8,
            Like = 9,
            Between = 10,
            In = 11,
            IsNull = 12,
            IsNotNull = 13,
            HasAny = 14,
            HasAll = 15,
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GroupByExpression {
        #[prost(oneof = "group_by_expression::ExType", tags = "1, 2")]
        pub ex_type: ::core::option::Option<group_by_expression::ExType>,
    }

    pub mod group_by_expression {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum ExType {
            #[prost(message, tag = "1")]
            Field(super::FieldReference),
            #[prost(message, tag = "2")]
            Derived(super::DerivedExpression),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct OrderByExpression {
        #[prost(message, optional, tag = "1")]
        pub argument: ::core::option::Option<Expression>,
        #[prost(enumeration = "order_by_expression::Direction", optional, tag = "2")]
        pub direction: ::core::option::Option<i32>,
    }

    pub mod order_by_expression {
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
        )]
        #[repr(i32)]
        pub enum Direction {
            Asc = 0,
            Desc = 1,
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientVersion {
    #[prost(enumeration = "client_version::Client", tag = "1")]
    pub client: i32,
    #[prost(string, tag = "2")]
    pub code_version: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub dataset_version: ::prost::alloc::string::String,
}

pub mod client_version {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Client {
        Unspecified = 0,
        Nodejs = 1,
        Python = 2,
        Csharp = 3,
        Golang = 4,
        Rust = 5,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryResult {
    #[prost(string, tag = "1")]
    pub query_string: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub json_data: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DisconnectRequest {
    #[prost(string, tag = "1")]
    pub connection_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DisconnectResponse {}

/// Generated client implementations.
pub mod query_agent_client {
    #![allow(unused_variables, dead_code, missing_docs, clippy::wildcard_imports)]
    use tonic::codegen::*;

    #[derive(Debug, Clone)]
    pub struct QueryAgentClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl QueryAgentClient<tonic::transport::Channel> {
        /// Attempt to create a new client by connecting to a given endpoint.
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }
    impl<T> QueryAgentClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::Body>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + std::marker::Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + std::marker::Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        pub async fn create_connection(
            &mut self,
            request: impl tonic::IntoRequest<super::ConnectionRequest>,
        ) -> std::result::Result<tonic::Response<super::ConnectionResponse>, tonic::Status>
        {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::unknown(
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic_prost::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/query_agent.QueryAgent/CreateConnection",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("query_agent.QueryAgent", "CreateConnection"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn execute_query(
            &mut self,
            request: impl tonic::IntoRequest<super::Query>,
        ) -> std::result::Result<tonic::Response<super::QueryResult>, tonic::Status> {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::unknown(
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic_prost::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/query_agent.QueryAgent/ExecuteQuery",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("query_agent.QueryAgent", "ExecuteQuery"));
            self.inner.unary(req, path, codec).await
        }
        pub async fn disconnect_connection(
            &mut self,
            request: impl tonic::IntoRequest<super::DisconnectRequest>,
        ) -> std::result::Result<tonic::Response<super::DisconnectResponse>, tonic::Status>
        {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::unknown(
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic_prost::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/query_agent.QueryAgent/DisconnectConnection",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("query_agent.QueryAgent", "DisconnectConnection"),
                );
            self.inner.unary(req, path, codec).await
        }
    }
}
