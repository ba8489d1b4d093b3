// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use alloy::sol;

sol! {
    /// Payment-stream contract the keeper settles.
    #[sol(rpc)]
    interface ILucidPay {
        function getActiveStreamIds() external view returns (uint256[] memory);
        function batchUpdateStreams(uint256[] calldata streamIds) external;

        error StreamNotFound(uint256 streamId);
        error StreamInactive(uint256 streamId);
    }

    /// Schema-typed, append-only data stream store.
    #[sol(rpc)]
    interface IDataStreams {
        struct DataSchema {
            string schemaName;
            string schema;
            bytes32 parentSchemaId;
        }

        struct DataStream {
            bytes32 id;
            bytes32 schemaId;
            bytes data;
        }

        function registerSchemas(DataSchema[] calldata schemas, bool ignoreRegisteredSchemas) external;
        function computeSchemaId(string calldata schema) external pure returns (bytes32);
        function isSchemaRegistered(bytes32 schemaId) external view returns (bool);
        function set(DataStream[] calldata dataStreams) external;
        function getAllPublisherDataForSchema(bytes32 schemaId, address publisher) external view returns (bytes[] memory);

        error SchemaAlreadyExists(bytes32 schemaId);
        error SchemaNotRegistered(bytes32 schemaId);
    }
}
